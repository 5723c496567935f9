use super::ClientContext;
use crate::medusa::{Address, ApiError, ApiResult, Cart, CartCompletion, CartUpdate, Order};
use crate::storage::{StateStore, StorageKey};

#[derive(Debug, Clone, Default)]
pub struct CartState {
    pub cart: Option<Cart>,
    pub loading: bool,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone)]
pub enum CartAction {
    Loading,
    Loaded(Cart),
    Failed(ApiError),
    Cleared,
}

/// Pure transition function of the cart mirror.
pub fn reduce(state: CartState, action: CartAction) -> CartState {
    match action {
        CartAction::Loading => CartState {
            loading: true,
            error: None,
            ..state
        },
        CartAction::Loaded(cart) => CartState {
            cart: Some(cart),
            loading: false,
            error: None,
        },
        // A failed request keeps the last known cart on screen.
        CartAction::Failed(error) => CartState {
            loading: false,
            error: Some(error),
            ..state
        },
        CartAction::Cleared => CartState::default(),
    }
}

impl CartState {
    pub fn item_count(&self) -> i64 {
        self.cart.as_ref().map_or(0, Cart::item_count)
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }
}

/// Cart operations for one profile: mutate in Medusa, re-fetch, dispatch.
pub struct CartSession<'a, S: StateStore> {
    ctx: ClientContext<'a, S>,
    region_id: Option<String>,
    state: CartState,
}

impl<'a, S: StateStore> CartSession<'a, S> {
    pub fn new(ctx: ClientContext<'a, S>, region_id: Option<String>) -> Self {
        Self {
            ctx,
            region_id,
            state: CartState::default(),
        }
    }

    pub fn state(&self) -> &CartState {
        &self.state
    }

    fn dispatch(&mut self, action: CartAction) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
    }

    pub async fn stored_cart_id(&self) -> Option<String> {
        self.ctx.read(&StorageKey::CartId).await
    }

    /// Load the profile's cart, forgetting the stored id if Medusa no longer knows it.
    pub async fn load(&mut self) -> &CartState {
        let Some(cart_id) = self.stored_cart_id().await else {
            self.dispatch(CartAction::Cleared);
            return &self.state;
        };

        self.dispatch(CartAction::Loading);
        match self.ctx.medusa.retrieve_cart(&cart_id).await {
            Ok(cart) => self.dispatch(CartAction::Loaded(cart)),
            Err(e) if e.is_not_found() => {
                log::info!("Stored cart {cart_id} is gone, starting over");
                self.ctx.clear(&StorageKey::CartId).await;
                self.dispatch(CartAction::Cleared);
            }
            Err(e) => self.dispatch(CartAction::Failed(e)),
        }
        &self.state
    }

    /// Id of a live cart, creating one in the configured (or first) region when needed.
    pub async fn ensure_cart(&mut self, token: Option<&str>) -> ApiResult<String> {
        if self.state.cart.is_none() {
            self.load().await;
        }
        if let Some(cart) = &self.state.cart {
            return Ok(cart.id.clone());
        }

        let region_id = match &self.region_id {
            Some(id) => id.clone(),
            None => self
                .ctx
                .medusa
                .list_regions()
                .await?
                .into_iter()
                .next()
                .map(|r| r.id)
                .ok_or_else(|| ApiError::new("No region is configured in the store", None))?,
        };

        let cart = self.ctx.medusa.create_cart(&region_id, token).await?;
        log::info!("Created cart {} for profile {}", cart.id, self.ctx.profile);
        self.ctx.write(&StorageKey::CartId, &cart.id).await;
        let id = cart.id.clone();
        self.dispatch(CartAction::Loaded(cart));
        Ok(id)
    }

    async fn refetch(&mut self, cart_id: &str) -> ApiResult<()> {
        match self.ctx.medusa.retrieve_cart(cart_id).await {
            Ok(cart) => {
                self.dispatch(CartAction::Loaded(cart));
                Ok(())
            }
            Err(e) => {
                self.dispatch(CartAction::Failed(e.clone()));
                Err(e)
            }
        }
    }

    fn fail<T>(&mut self, e: ApiError) -> ApiResult<T> {
        self.dispatch(CartAction::Failed(e.clone()));
        Err(e)
    }

    pub async fn add_item(&mut self, variant_id: &str, quantity: i64, token: Option<&str>) -> ApiResult<()> {
        let cart_id = self.ensure_cart(token).await?;
        self.dispatch(CartAction::Loading);
        if let Err(e) = self.ctx.medusa.add_line_item(&cart_id, variant_id, quantity).await {
            return self.fail(e);
        }
        self.refetch(&cart_id).await
    }

    /// Set a line's quantity; zero removes the line.
    pub async fn update_item(&mut self, line_id: &str, quantity: i64) -> ApiResult<()> {
        if quantity <= 0 {
            return self.remove_item(line_id).await;
        }
        let cart_id = self.require_cart_id().await?;
        self.dispatch(CartAction::Loading);
        if let Err(e) = self.ctx.medusa.update_line_item(&cart_id, line_id, quantity).await {
            return self.fail(e);
        }
        self.refetch(&cart_id).await
    }

    pub async fn remove_item(&mut self, line_id: &str) -> ApiResult<()> {
        let cart_id = self.require_cart_id().await?;
        self.dispatch(CartAction::Loading);
        if let Err(e) = self.ctx.medusa.delete_line_item(&cart_id, line_id).await {
            return self.fail(e);
        }
        self.refetch(&cart_id).await
    }

    /// Store the contact e-mail and use one address for shipping and billing.
    pub async fn set_contact(&mut self, email: &str, address: Address) -> ApiResult<()> {
        let cart_id = self.require_cart_id().await?;
        let update = CartUpdate {
            email: Some(email.to_string()),
            shipping_address: Some(address.clone()),
            billing_address: Some(address),
        };
        self.dispatch(CartAction::Loading);
        if let Err(e) = self.ctx.medusa.update_cart(&cart_id, &update).await {
            return self.fail(e);
        }
        self.refetch(&cart_id).await
    }

    pub async fn set_shipping(&mut self, option_id: &str) -> ApiResult<()> {
        let cart_id = self.require_cart_id().await?;
        self.dispatch(CartAction::Loading);
        if let Err(e) = self.ctx.medusa.add_shipping_method(&cart_id, option_id).await {
            return self.fail(e);
        }
        self.refetch(&cart_id).await
    }

    /// Attach the cart to a freshly logged-in customer. A missing cart is not an error.
    pub async fn attach_customer(&mut self, token: &str) -> ApiResult<()> {
        let Some(cart_id) = self.stored_cart_id().await else {
            return Ok(());
        };
        if let Err(e) = self.ctx.medusa.transfer_cart(&cart_id, token).await {
            return self.fail(e);
        }
        self.refetch(&cart_id).await
    }

    /// Open a payment session and place the order. On success the stored cart id is dropped.
    pub async fn complete(&mut self, payment_provider: &str) -> ApiResult<Order> {
        if self.state.cart.is_none() {
            self.load().await;
        }
        let Some(cart) = self.state.cart.clone() else {
            return self.fail(ApiError::new("Koszyk jest pusty", None));
        };
        if !cart.is_ready_for_completion() {
            return self.fail(ApiError::new(
                "Uzupełnij dane kontaktowe, adres i sposób dostawy",
                None,
            ));
        }

        self.dispatch(CartAction::Loading);
        if let Err(e) = self.ctx.medusa.initiate_payment(&cart, payment_provider).await {
            return self.fail(e);
        }
        match self.ctx.medusa.complete_cart(&cart.id).await {
            Ok(CartCompletion::Placed(order)) => {
                log::info!("Order {} placed from cart {}", order.id, cart.id);
                self.ctx.clear(&StorageKey::CartId).await;
                self.dispatch(CartAction::Cleared);
                Ok(order)
            }
            Ok(CartCompletion::Rejected { message, .. }) => {
                log::warn!("Cart {} not completed: {message}", cart.id);
                self.refetch(&cart.id).await?;
                self.fail(ApiError::new(message, None))
            }
            Err(e) => self.fail(e),
        }
    }

    async fn require_cart_id(&mut self) -> ApiResult<String> {
        match self.stored_cart_id().await {
            Some(id) => Ok(id),
            None => self.fail(ApiError::new("Koszyk jest pusty", Some(404))),
        }
    }
}
