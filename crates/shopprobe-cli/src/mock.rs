//! In-process storefront used by the tests.
//!
//! Serves the auth, catalog, cart, checkout and order endpoints on an
//! ephemeral port, with switches for the response shapes and failure modes
//! the probes have to cope with.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginShape {
    /// `{"accessToken": .., "user": {"id": ..}}`
    Nested,
    /// `{"accessToken": .., "id": ..}`
    Flat,
    /// Token present, user id nowhere the probe looks.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutShape {
    /// The order itself: `{"id": .., "orderNumber": ..}`
    Flat,
    /// `{"orderId": ..}` without a display number.
    OrderIdKey,
    /// `{"success": true, "order": {"id": .., "orderNumber": ..}}`
    Nested,
}

#[derive(Debug, Clone)]
pub struct MockOptions {
    pub login_shape: LoginShape,
    pub checkout_shape: CheckoutShape,
    pub checkout_status: u16,
    /// Whether checkout eventually decrements stock.
    pub stock_consumer: bool,
    pub stock_delay_ms: u64,
    /// Health requests allowed before answering 429.
    pub health_limit: Option<usize>,
    /// Extra latency of the first product listing.
    pub listing_cold_delay_ms: u64,
    /// Status of every listing after the first.
    pub warm_listing_status: u16,
    /// Report `stockQuantity` as `8.0` rather than `8`.
    pub stock_as_float: bool,
    pub total_ignores_quantity: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            login_shape: LoginShape::Nested,
            checkout_shape: CheckoutShape::Flat,
            checkout_status: 200,
            stock_consumer: true,
            stock_delay_ms: 0,
            health_limit: None,
            listing_cold_delay_ms: 0,
            warm_listing_status: 200,
            stock_as_float: false,
            total_ignores_quantity: false,
        }
    }
}

#[derive(Debug)]
struct Product {
    id: u64,
    name: String,
    price: f64,
    stock: i64,
}

impl Product {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "price": self.price,
            "stockQuantity": self.stock,
        })
    }
}

#[derive(Debug, Clone)]
struct CartLine {
    product_id: u64,
    price: f64,
    quantity: i64,
}

#[derive(Debug, Default)]
struct Store {
    users: HashMap<String, (u64, String)>,
    next_user: u64,
    next_category: u64,
    products: HashMap<u64, Product>,
    next_product: u64,
    carts: HashMap<String, Vec<CartLine>>,
    orders: Vec<(String, Value)>,
    health_hits: usize,
    listing_warm: bool,
}

#[derive(Clone)]
struct MockState {
    opts: Arc<MockOptions>,
    store: Arc<Mutex<Store>>,
}

pub struct MockStorefront {
    base_url: String,
    store: Arc<Mutex<Store>>,
    server: tokio::task::JoinHandle<()>,
}

impl MockStorefront {
    pub async fn start() -> Self {
        Self::start_with(MockOptions::default()).await
    }

    pub async fn start_with(opts: MockOptions) -> Self {
        let store = Arc::new(Mutex::new(Store::default()));
        let st = MockState {
            opts: Arc::new(opts),
            store: store.clone(),
        };

        let app = Router::new()
            .route("/api/auth/register", post(register))
            .route("/api/auth/login", post(login))
            .route("/api/auth/health", get(health))
            .route("/api/categories", post(create_category))
            .route("/api/products", get(list_products).post(create_product))
            .route("/api/products/:id", get(get_product))
            .route("/api/cart/items", post(add_item))
            .route("/api/cart/checkout", post(checkout))
            .route("/api/orders", get(list_orders))
            .with_state(st);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            store,
            server,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn valid_token(&self) -> String {
        "tok-0".to_string()
    }

    pub async fn health_hits(&self) -> usize {
        self.store.lock().await.health_hits
    }

    pub async fn stock_of(&self, product_id: u64) -> Option<i64> {
        self.store
            .lock()
            .await
            .products
            .get(&product_id)
            .map(|p| p.stock)
    }
}

impl Drop for MockStorefront {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A URL nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/auth/health")
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn unauthorized() -> Response {
    reply(StatusCode::UNAUTHORIZED, json!({"error": "Unauthorized"}))
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|t| t.starts_with("tok-"))
        .map(str::to_string)
}

async fn register(State(st): State<MockState>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    let mut store = st.store.lock().await;
    if store.users.contains_key(&email) {
        return reply(
            StatusCode::CONFLICT,
            json!({"error": "Email already registered"}),
        );
    }
    store.next_user += 1;
    let id = store.next_user;
    store.users.insert(email.clone(), (id, password));
    reply(StatusCode::CREATED, json!({"id": id, "email": email}))
}

async fn login(State(st): State<MockState>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let store = st.store.lock().await;
    let Some((id, _)) = store.users.get(email).filter(|(_, p)| p == password) else {
        return reply(StatusCode::UNAUTHORIZED, json!({"error": "Bad credentials"}));
    };
    let token = format!("tok-{id}");
    let body = match st.opts.login_shape {
        LoginShape::Nested => json!({
            "accessToken": token,
            "tokenType": "Bearer",
            "user": {"id": id, "email": email},
        }),
        LoginShape::Flat => json!({"accessToken": token, "id": id}),
        LoginShape::Unknown => json!({"accessToken": token, "profile": {"uid": id}}),
    };
    reply(StatusCode::OK, body)
}

async fn health(State(st): State<MockState>) -> Response {
    let mut store = st.store.lock().await;
    store.health_hits += 1;
    match st.opts.health_limit {
        Some(limit) if store.health_hits > limit => reply(
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": "Too many requests"}),
        ),
        _ => reply(StatusCode::OK, json!({"status": "UP"})),
    }
}

async fn create_category(
    State(st): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if bearer(&headers).is_none() {
        return unauthorized();
    }
    let mut store = st.store.lock().await;
    store.next_category += 1;
    reply(
        StatusCode::CREATED,
        json!({"id": store.next_category, "name": body["name"], "description": body["description"]}),
    )
}

async fn create_product(
    State(st): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if bearer(&headers).is_none() {
        return unauthorized();
    }
    let mut store = st.store.lock().await;
    store.next_product += 1;
    let product = Product {
        id: store.next_product,
        name: body["name"].as_str().unwrap_or_default().to_string(),
        price: body["price"].as_f64().unwrap_or_default(),
        stock: body["stockQuantity"].as_i64().unwrap_or_default(),
    };
    let json = product.to_json();
    store.products.insert(product.id, product);
    reply(StatusCode::CREATED, json)
}

async fn get_product(State(st): State<MockState>, Path(id): Path<u64>) -> Response {
    let store = st.store.lock().await;
    match store.products.get(&id) {
        Some(p) => {
            let mut body = p.to_json();
            if st.opts.stock_as_float {
                body["stockQuantity"] = json!(p.stock as f64);
            }
            reply(StatusCode::OK, body)
        }
        None => reply(StatusCode::NOT_FOUND, json!({"error": "Product not found"})),
    }
}

async fn list_products(State(st): State<MockState>) -> Response {
    let cold = {
        let mut store = st.store.lock().await;
        !std::mem::replace(&mut store.listing_warm, true)
    };
    if cold && st.opts.listing_cold_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(st.opts.listing_cold_delay_ms)).await;
    }
    if !cold && st.opts.warm_listing_status != 200 {
        let status = StatusCode::from_u16(st.opts.warm_listing_status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return reply(status, json!({"error": "listing unavailable"}));
    }
    let store = st.store.lock().await;
    let content: Vec<Value> = store.products.values().map(Product::to_json).collect();
    reply(
        StatusCode::OK,
        json!({"content": content, "totalElements": content.len()}),
    )
}

async fn add_item(
    State(st): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let Some(token) = bearer(&headers) else {
        return unauthorized();
    };
    let line = CartLine {
        product_id: body["productId"].as_u64().unwrap_or_default(),
        price: body["price"].as_f64().unwrap_or_default(),
        quantity: body["quantity"].as_i64().unwrap_or_default(),
    };
    let mut store = st.store.lock().await;
    let cart = store.carts.entry(token.clone()).or_default();
    cart.push(line);
    let total: f64 = cart
        .iter()
        .map(|l| {
            if st.opts.total_ignores_quantity {
                l.price
            } else {
                l.price * l.quantity as f64
            }
        })
        .sum();
    let items: Vec<Value> = cart
        .iter()
        .map(|l| json!({"productId": l.product_id, "price": l.price, "quantity": l.quantity}))
        .collect();
    reply(
        StatusCode::OK,
        json!({"userId": token, "items": items, "totalAmount": total}),
    )
}

async fn checkout(
    State(st): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let Some(token) = bearer(&headers) else {
        return unauthorized();
    };
    if st.opts.checkout_status != 200 {
        let status =
            StatusCode::from_u16(st.opts.checkout_status).unwrap_or(StatusCode::BAD_REQUEST);
        return reply(status, json!({"error": "Checkout failed"}));
    }

    let mut store = st.store.lock().await;
    let lines = store.carts.remove(&token).unwrap_or_default();
    let id = store.orders.len() as u64 + 1;
    let total: f64 = lines.iter().map(|l| l.price * l.quantity as f64).sum();
    let order = json!({
        "id": id,
        "orderNumber": format!("ORD-{id:04}"),
        "status": "PENDING",
        "totalAmount": total,
        "shippingAddress": body["shippingAddress"],
        "paymentMethod": body["paymentMethod"],
    });
    store.orders.push((token, order.clone()));
    drop(store);

    if st.opts.stock_consumer {
        let store = st.store.clone();
        let delay = Duration::from_millis(st.opts.stock_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut store = store.lock().await;
            for l in lines {
                if let Some(p) = store.products.get_mut(&l.product_id) {
                    p.stock -= l.quantity;
                }
            }
        });
    }

    let body = match st.opts.checkout_shape {
        CheckoutShape::Flat => order,
        CheckoutShape::OrderIdKey => json!({"orderId": id, "status": "PENDING"}),
        CheckoutShape::Nested => json!({
            "success": true,
            "message": "Order created",
            "order": order,
        }),
    };
    reply(StatusCode::OK, body)
}

async fn list_orders(State(st): State<MockState>, headers: HeaderMap) -> Response {
    let Some(token) = bearer(&headers) else {
        return unauthorized();
    };
    let store = st.store.lock().await;
    let orders: Vec<Value> = store
        .orders
        .iter()
        .filter(|(owner, _)| owner == &token)
        .map(|(_, o)| o.clone())
        .collect();
    reply(StatusCode::OK, Value::Array(orders))
}
