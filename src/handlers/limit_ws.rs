use actix_web::{HttpRequest, HttpResponse, web};
use actix_ws::Message;
use tokio::sync::mpsc;

use crate::app::AppState;
use crate::auth::rate_limit::{CountdownEvent, run_countdown};
use crate::errors::AppError;
use crate::storage::ProfileId;

/// WebSocket upgrade handler. Streams countdown ticks for a blocked action and
/// closes after the final status.
pub async fn connect(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<AppState>,
    profile: ProfileId,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let key = path.into_inner();
    if !state.config.limiter.contains(&key) {
        return Err(AppError::NotFound.into());
    }

    let (response, mut ws_session, mut msg_stream) = actix_ws::handle(&req, body)?;
    let (tx, mut rx) = mpsc::channel::<CountdownEvent>(8);

    let driver = actix_web::rt::spawn(async move {
        run_countdown(&state.limiter, &profile, &key, tx).await;
    });

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = rx.recv() => {
                    let last = matches!(event, CountdownEvent::Status(_));
                    let Ok(text) = serde_json::to_string(&event) else {
                        break;
                    };
                    if ws_session.text(text).await.is_err() || last {
                        break;
                    }
                }
                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if ws_session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                else => break,
            }
        }

        // Stop ticking once nobody listens.
        driver.abort();
        let _ = ws_session.close(None).await;
    });

    Ok(response)
}
