//! End-to-end storefront chain: account, catalog, cart, checkout, effects.

use serde_json::{json, Value};
use tracing::Instrument;

use shopprobe_common::{
    join_url, to_cents, Extractor, ProbeConfig, ProbeRequest, Purchase, Result,
    SessionContext,
};

use crate::client::ProbeClient;
use crate::output;
use crate::scenario::{body, Expect, ScenarioRunner, Step};
use crate::verify::{self, Assertion, Outcome};

/// Response shapes the services are known to use for each captured field.
pub struct Extractors {
    pub token: Extractor,
    pub user_id: Extractor,
    pub entity_id: Extractor,
    pub order_id: Extractor,
    pub order_number: Extractor,
}

impl Default for Extractors {
    fn default() -> Self {
        Self {
            token: Extractor::new("access token", &["accessToken", "token"]),
            user_id: Extractor::new("user id", &["user.id", "id", "userId"]),
            entity_id: Extractor::new("id", &["id"]),
            order_id: Extractor::new("order id", &["id", "orderId", "order.id"]),
            order_number: Extractor::new("order number", &["orderNumber", "order.orderNumber"]),
        }
    }
}

#[derive(Debug)]
pub struct ChainReport {
    pub email: String,
    pub steps: usize,
    pub assertions: Vec<Assertion>,
}

pub struct StorefrontChain<'a> {
    client: &'a ProbeClient,
    config: &'a ProbeConfig,
    extractors: Extractors,
    runner: ScenarioRunner<'a>,
    ctx: SessionContext,
    email: String,
}

impl<'a> StorefrontChain<'a> {
    pub fn new(client: &'a ProbeClient, config: &'a ProbeConfig, email: String) -> Self {
        Self {
            client,
            config,
            extractors: Extractors::default(),
            runner: ScenarioRunner::new(client),
            ctx: SessionContext::new(),
            email,
        }
    }

    /// Run every stage in order. The first fatal error ends the chain.
    pub async fn run(mut self) -> Result<ChainReport> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("storefront_chain", %run_id, email = %self.email);
        async move {
            tracing::info!("starting storefront chain");
            let mut assertions = Vec::new();

            self.authenticate().await?;
            self.create_catalog().await?;
            assertions.push(self.add_to_cart().await?);
            self.checkout().await?;

            output::print_section("5. Verifying Async Effects (Stock Reduction)");
            assertions.extend(verify::verify_effects(self.client, self.config, &self.ctx).await?);

            output::print_summary(&assertions);
            tracing::info!(steps = self.runner.completed(), "storefront chain finished");
            Ok(ChainReport {
                email: self.email,
                steps: self.runner.completed(),
                assertions,
            })
        }
        .instrument(span)
        .await
    }

    fn services(&self) -> &'a shopprobe_common::ServiceUrls {
        &self.config.services
    }

    pub async fn authenticate(&mut self) -> Result<()> {
        output::print_section("1. Testing Auth Service (Register & Login)");
        let auth_url = &self.services().auth_url;
        let account = &self.config.account;

        // Status is not checked: on a re-run the account may already exist.
        self.runner
            .run(Step::new(
                format!("Registering user {}", self.email),
                ProbeRequest::post(join_url(auth_url, "register")).json(json!({
                    "email": self.email,
                    "name": account.display_name,
                    "password": account.password,
                })),
                Expect::AnyStatus,
            ))
            .await?;

        let login = self
            .runner
            .run(Step::new(
                "Logging in",
                ProbeRequest::post(join_url(auth_url, "login")).json(json!({
                    "email": self.email,
                    "password": account.password,
                })),
                Expect::Status(200),
            ))
            .await?;
        let data = body(&login);
        let token = self.extractors.token.extract_str(data)?;
        let user_id = self.extractors.user_id.extract_id(data)?;

        println!("Got Token: {}... User ID: {user_id}", preview(&token, 20));
        self.ctx.set_token(token)?;
        self.ctx.set_user_id(user_id)?;
        Ok(())
    }

    pub async fn create_catalog(&mut self) -> Result<()> {
        output::print_section("2. Testing Product Service (Create Category & Product)");
        let services = self.services();
        let catalog = &self.config.catalog;
        let token = self.ctx.token()?.to_string();

        let category = self
            .runner
            .run(Step::new(
                format!("Creating category '{}'", catalog.category_name),
                ProbeRequest::post(&services.category_url)
                    .bearer(&token)
                    .json(json!({
                        "name": catalog.category_name,
                        "description": catalog.category_description,
                    })),
                Expect::Status(201),
            ))
            .await?;
        let category_id = self.extractors.entity_id.extract_id(body(&category))?;
        self.ctx.set_category_id(category_id)?;

        let product = self
            .runner
            .run(Step::new(
                format!("Creating product '{}'", catalog.product_name),
                ProbeRequest::post(&services.product_url)
                    .bearer(&token)
                    .json(json!({
                        "name": catalog.product_name,
                        "description": catalog.product_description,
                        "price": catalog.price,
                        "stockQuantity": catalog.initial_stock,
                        "categoryId": self.ctx.category_id()?.to_json(),
                        "images": [catalog.image_url],
                    })),
                Expect::Status(201),
            ))
            .await?;
        let product_id = self.extractors.entity_id.extract_id(body(&product))?;
        println!(
            "Created Product ID: {product_id} with Stock: {}",
            catalog.initial_stock
        );
        self.ctx.set_product_id(product_id)?;
        Ok(())
    }

    /// Add the product and check the cart total. A wrong total is reported,
    /// not fatal.
    pub async fn add_to_cart(&mut self) -> Result<Assertion> {
        output::print_section("3. Testing Cart Service (Add Item)");
        let catalog = &self.config.catalog;
        let cart_url = join_url(&self.services().cart_url, "items");
        let token = self.ctx.token()?.to_string();
        let product_id = self.ctx.product_id()?.clone();

        let cart = self
            .runner
            .run(Step::new(
                format!("Adding product {product_id} to cart"),
                ProbeRequest::post(cart_url)
                    .bearer(&token)
                    .json(json!({
                        "productId": product_id.to_json(),
                        "productName": catalog.product_name,
                        "price": catalog.price,
                        "quantity": catalog.quantity,
                        "imageUrl": catalog.image_url,
                    })),
                Expect::Status(200),
            ))
            .await?;
        self.ctx.set_purchase(Purchase {
            initial_stock: catalog.initial_stock,
            quantity: catalog.quantity,
        })?;

        let assertion = Assertion::new(
            "Cart total",
            check_total(body(&cart), catalog.expected_total_cents()),
        );
        output::print_assertion(&assertion);
        Ok(assertion)
    }

    pub async fn checkout(&mut self) -> Result<()> {
        output::print_section("4. Testing Checkout (Order Creation & Stock Update)");
        let checkout_url = join_url(&self.services().cart_url, "checkout");
        let catalog = &self.config.catalog;
        let token = self.ctx.token()?.to_string();

        let resp = self
            .runner
            .run(Step::new(
                "Processing checkout",
                ProbeRequest::post(checkout_url)
                    .bearer(&token)
                    .json(json!({
                        "shippingAddress": catalog.shipping_address,
                        "paymentMethod": catalog.payment_method,
                    })),
                Expect::Status(200),
            ))
            .await?;
        let data = body(&resp);
        tracing::debug!(response = %data, "checkout response");

        let order_id = self.extractors.order_id.extract_id(data)?;
        if let Ok(number) = self.extractors.order_number.extract_str(data) {
            self.ctx.set_order_number(number)?;
        }
        println!("Order Created! ID: {order_id}");
        self.ctx.set_order_id(order_id)?;
        Ok(())
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }
}

/// Compare the reported cart total with P x Q in whole cents.
pub fn check_total(cart: &Value, expected_cents: i64) -> Outcome {
    let expected = format_cents(expected_cents);
    let observed = cart.get("totalAmount").and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    });
    match observed {
        Some(total) if to_cents(total) == expected_cents => Outcome::Confirmed {
            observed: format_cents(to_cents(total)),
        },
        Some(total) => Outcome::Mismatch {
            expected,
            observed: total.to_string(),
        },
        None => Outcome::Mismatch {
            expected,
            observed: "no totalAmount".to_string(),
        },
    }
}

fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

fn preview(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
