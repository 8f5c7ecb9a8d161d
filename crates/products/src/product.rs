use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use grocer_core::{Aggregate, AggregateRoot, DomainError, Event, Money, RecordId};
use grocer_inventory::{StockLevel, UnderflowPolicy};

/// Product identifier (auto-increment key of the `products` collection).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub RecordId);

impl ProductId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl From<u64> for ProductId {
    fn from(raw: u64) -> Self {
        Self(RecordId::new(raw))
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Product.
///
/// Serialized as the stored record:
/// `{ "id", "name", "barcode", "quantity", "avg_cost", "sale_price" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    #[serde(default)]
    barcode: Option<String>,
    #[serde(flatten)]
    stock: StockLevel,
    sale_price: Money,
    #[serde(skip, default = "loaded_from_store")]
    created: bool,
}

fn loaded_from_store() -> bool {
    true
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            name: String::new(),
            barcode: None,
            stock: StockLevel::default(),
            sale_price: Money::ZERO,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn barcode(&self) -> Option<&str> {
        self.barcode.as_deref()
    }

    pub fn stock(&self) -> StockLevel {
        self.stock
    }

    pub fn quantity(&self) -> i64 {
        self.stock.quantity
    }

    pub fn avg_cost(&self) -> Money {
        self.stock.avg_cost
    }

    pub fn sale_price(&self) -> Money {
        self.sale_price
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: CreateProduct. Stock and average cost start at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub name: String,
    pub barcode: Option<String>,
    pub sale_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProductDetails. Stock and average cost are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProductDetails {
    pub product_id: ProductId,
    pub name: String,
    pub barcode: Option<String>,
    pub sale_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveStock (purchase line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: IssueStock (sale line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStock {
    pub product_id: ProductId,
    pub quantity: i64,
    pub policy: UnderflowPolicy,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    UpdateProductDetails(UpdateProductDetails),
    ReceiveStock(ReceiveStock),
    IssueStock(IssueStock),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub name: String,
    pub barcode: Option<String>,
    pub sale_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductDetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetailsUpdated {
    pub product_id: ProductId,
    pub name: String,
    pub barcode: Option<String>,
    pub sale_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReceived. Carries the resulting level so `apply` stays trivial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReceived {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: Money,
    pub level: StockLevel,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockIssued {
    pub product_id: ProductId,
    pub requested: i64,
    pub issued: i64,
    pub shortfall: i64,
    pub level: StockLevel,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductDetailsUpdated(ProductDetailsUpdated),
    StockReceived(StockReceived),
    StockIssued(StockIssued),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::ProductDetailsUpdated(_) => "products.product.details_updated",
            ProductEvent::StockReceived(_) => "products.product.stock_received",
            ProductEvent::StockIssued(_) => "products.product.stock_issued",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductDetailsUpdated(e) => e.occurred_at,
            ProductEvent::StockReceived(e) => e.occurred_at,
            ProductEvent::StockIssued(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.name = e.name.clone();
                self.barcode = e.barcode.clone();
                self.sale_price = e.sale_price;
                self.stock = StockLevel::default();
                self.created = true;
            }
            ProductEvent::ProductDetailsUpdated(e) => {
                self.name = e.name.clone();
                self.barcode = e.barcode.clone();
                self.sale_price = e.sale_price;
            }
            ProductEvent::StockReceived(e) => {
                self.stock = e.level;
            }
            ProductEvent::StockIssued(e) => {
                self.stock = e.level;
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::UpdateProductDetails(cmd) => self.handle_update(cmd),
            ProductCommand::ReceiveStock(cmd) => self.handle_receive(cmd),
            ProductCommand::IssueStock(cmd) => self.handle_issue(cmd),
        }
    }
}

/// Blank barcodes are stored as absent so they never collide on uniqueness.
fn normalize_barcode(barcode: &Option<String>) -> Option<String> {
    barcode
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
}

impl Product {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("product {}", self.id)));
        }
        Ok(())
    }

    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn validate_details(name: &str, sale_price: Money) -> Result<(), DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if sale_price.is_negative() {
            return Err(DomainError::validation("sale price cannot be negative"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        Self::validate_details(&cmd.name, cmd.sale_price)?;

        // Barcode uniqueness needs the whole catalog; the catalog service checks it.
        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            name: cmd.name.trim().to_string(),
            barcode: normalize_barcode(&cmd.barcode),
            sale_price: cmd.sale_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateProductDetails) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_product_id(cmd.product_id)?;
        Self::validate_details(&cmd.name, cmd.sale_price)?;

        Ok(vec![ProductEvent::ProductDetailsUpdated(ProductDetailsUpdated {
            product_id: cmd.product_id,
            name: cmd.name.trim().to_string(),
            barcode: normalize_barcode(&cmd.barcode),
            sale_price: cmd.sale_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(&self, cmd: &ReceiveStock) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_product_id(cmd.product_id)?;

        let level = self.stock.receive(cmd.quantity, cmd.unit_cost)?;

        Ok(vec![ProductEvent::StockReceived(StockReceived {
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            unit_cost: cmd.unit_cost,
            level,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_issue(&self, cmd: &IssueStock) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_product_id(cmd.product_id)?;

        let issue = self.stock.issue(cmd.quantity, cmd.policy).map_err(|e| match e {
            DomainError::InvariantViolation(msg) => {
                DomainError::invariant(format!("product {} ({}): {msg}", self.id, self.name))
            }
            other => other,
        })?;

        Ok(vec![ProductEvent::StockIssued(StockIssued {
            product_id: cmd.product_id,
            requested: cmd.quantity,
            issued: issue.issued,
            shortfall: issue.shortfall,
            level: issue.level,
            occurred_at: cmd.occurred_at,
        })])
    }
}
