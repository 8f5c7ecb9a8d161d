use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use grocer_core::{Aggregate, AggregateRoot, DomainError, Event, Money, RecordId, money};

/// Party identifier (auto-increment key within its kind's collection).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(pub RecordId);

impl PartyId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl From<u64> for PartyId {
    fn from(raw: u64) -> Self {
        Self(RecordId::new(raw))
    }
}

impl core::fmt::Display for PartyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Party kind: customer or supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl PartyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
        }
    }
}

impl core::fmt::Display for PartyKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact information for a party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub phone: Option<String>,
    /// Free-form contact line (person, address, notes).
    #[serde(default)]
    pub details: Option<String>,
}

/// Aggregate root: Party (customer or supplier).
///
/// `balance` is what the party owes the store for customers, and what the
/// store owes the party for suppliers. Negative means credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    id: PartyId,
    kind: PartyKind,
    name: String,
    #[serde(flatten)]
    contact: ContactInfo,
    #[serde(default)]
    balance: Money,
    #[serde(skip, default = "loaded_from_store")]
    created: bool,
}

fn loaded_from_store() -> bool {
    true
}

impl Party {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: PartyId, kind: PartyKind) -> Self {
        Self {
            id,
            kind,
            name: String::new(),
            contact: ContactInfo::default(),
            balance: Money::ZERO,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PartyId {
        self.id
    }

    pub fn kind(&self) -> PartyKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Party {
    type Id = PartyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Command: RegisterParty. Balance starts at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterParty {
    pub party_id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    pub contact: Option<ContactInfo>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDetails. Balance is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub party_id: PartyId,
    /// Optional new name (if None, keep existing).
    pub name: Option<String>,
    /// Optional new contact info (if None, keep existing).
    pub contact: Option<ContactInfo>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChargeBalance (deferred sale or purchase increases what is owed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeBalance {
    pub party_id: PartyId,
    pub amount: Money,
    /// Originating record, e.g. `"sale 12"`.
    pub reference: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SettleBalance (payment reduces what is owed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleBalance {
    pub party_id: PartyId,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyCommand {
    RegisterParty(RegisterParty),
    UpdateDetails(UpdateDetails),
    ChargeBalance(ChargeBalance),
    SettleBalance(SettleBalance),
}

/// Event: PartyRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRegistered {
    pub party_id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    pub contact: ContactInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PartyUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyUpdated {
    pub party_id: PartyId,
    pub name: String,
    pub contact: ContactInfo,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BalanceCharged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCharged {
    pub party_id: PartyId,
    pub amount: Money,
    pub reference: String,
    pub balance: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BalanceSettled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSettled {
    pub party_id: PartyId,
    pub amount: Money,
    pub balance: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyEvent {
    PartyRegistered(PartyRegistered),
    PartyUpdated(PartyUpdated),
    BalanceCharged(BalanceCharged),
    BalanceSettled(BalanceSettled),
}

impl Event for PartyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartyEvent::PartyRegistered(_) => "parties.party.registered",
            PartyEvent::PartyUpdated(_) => "parties.party.updated",
            PartyEvent::BalanceCharged(_) => "parties.party.balance_charged",
            PartyEvent::BalanceSettled(_) => "parties.party.balance_settled",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PartyEvent::PartyRegistered(e) => e.occurred_at,
            PartyEvent::PartyUpdated(e) => e.occurred_at,
            PartyEvent::BalanceCharged(e) => e.occurred_at,
            PartyEvent::BalanceSettled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Party {
    type Command = PartyCommand;
    type Event = PartyEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PartyEvent::PartyRegistered(e) => {
                self.id = e.party_id;
                self.kind = e.kind;
                self.name = e.name.clone();
                self.contact = e.contact.clone();
                self.balance = Money::ZERO;
                self.created = true;
            }
            PartyEvent::PartyUpdated(e) => {
                self.name = e.name.clone();
                self.contact = e.contact.clone();
            }
            PartyEvent::BalanceCharged(e) => {
                self.balance = e.balance;
            }
            PartyEvent::BalanceSettled(e) => {
                self.balance = e.balance;
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PartyCommand::RegisterParty(cmd) => self.handle_register(cmd),
            PartyCommand::UpdateDetails(cmd) => self.handle_update(cmd),
            PartyCommand::ChargeBalance(cmd) => self.handle_charge(cmd),
            PartyCommand::SettleBalance(cmd) => self.handle_settle(cmd),
        }
    }
}

impl Party {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("{} {}", self.kind, self.id)));
        }
        Ok(())
    }

    fn ensure_party_id(&self, party_id: PartyId) -> Result<(), DomainError> {
        if self.id != party_id {
            return Err(DomainError::invariant("party_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterParty) -> Result<Vec<PartyEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("party already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let contact = cmd.contact.clone().unwrap_or_default();

        Ok(vec![PartyEvent::PartyRegistered(PartyRegistered {
            party_id: cmd.party_id,
            kind: cmd.kind,
            name: cmd.name.trim().to_string(),
            contact,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateDetails) -> Result<Vec<PartyEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_party_id(cmd.party_id)?;

        let new_name = cmd.name.clone().unwrap_or_else(|| self.name.clone());
        if new_name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let new_contact = cmd.contact.clone().unwrap_or_else(|| self.contact.clone());

        Ok(vec![PartyEvent::PartyUpdated(PartyUpdated {
            party_id: cmd.party_id,
            name: new_name.trim().to_string(),
            contact: new_contact,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_charge(&self, cmd: &ChargeBalance) -> Result<Vec<PartyEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_party_id(cmd.party_id)?;

        // Zero is allowed: a fully discounted deferred sale still posts.
        if cmd.amount.is_negative() {
            return Err(DomainError::validation("charged amount cannot be negative"));
        }

        Ok(vec![PartyEvent::BalanceCharged(BalanceCharged {
            party_id: cmd.party_id,
            amount: cmd.amount,
            reference: cmd.reference.clone(),
            balance: self.balance.checked_add(cmd.amount).ok_or_else(money::overflow)?,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_settle(&self, cmd: &SettleBalance) -> Result<Vec<PartyEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_party_id(cmd.party_id)?;

        if !cmd.amount.is_positive() {
            return Err(DomainError::validation("payment amount must be positive"));
        }

        // Overpayment is allowed and leaves the party in credit.
        Ok(vec![PartyEvent::BalanceSettled(BalanceSettled {
            party_id: cmd.party_id,
            amount: cmd.amount,
            balance: self.balance.checked_sub(cmd.amount).ok_or_else(money::overflow)?,
            occurred_at: cmd.occurred_at,
        })])
    }
}
