use askama::Template;

/// Stand-alone page for a failed Medusa call. Needs no session, so it renders
/// from inside `ResponseError`.
#[derive(Template)]
#[template(path = "errors/502.html")]
pub struct UpstreamErrorTemplate {
    pub message: String,
}
