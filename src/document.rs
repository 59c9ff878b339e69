//! Document records – the typed input of every composer.
//!
//! Records arrive as camelCase JSON from the surrounding form UI. Every kind
//! flattens the shared [`DocumentHeader`] block so `companyName`-style fields
//! sit at the top level next to the kind-specific ones.

use serde::{Deserialize, Serialize};

/// Company identity as stored on a document. Empty fields are filled from the
/// caller's [`Profile`] at render time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompanyBlock {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub license_number: String,
    pub logo_url: String,
}

/// Client identity. Never falls back to anything: empty stays empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientBlock {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

/// Saved company profile of the signed-in contractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Profile {
    pub company_name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub license_number: String,
    pub logo_url: String,
}

/// Per-document colour override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub primary: String,
    pub secondary: String,
}

/// Fields shared by every document kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentHeader {
    pub company: CompanyBlock,
    pub client: ClientBlock,
    /// Issue date, already formatted for display.
    pub date: String,
    pub template_id: String,
    pub theme: Option<Theme>,
    /// Contractor signature image (data URI or URL).
    pub signature: Option<String>,
}

/// A billable row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    /// Only consulted in progress-billing mode.
    pub percent_complete: Option<f64>,
}

impl LineItem {
    pub fn new(description: &str, quantity: f64, rate: f64) -> Self {
        Self {
            description: description.to_string(),
            quantity,
            rate,
            percent_complete: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Invoice {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub invoice_number: String,
    pub due_date: String,
    pub project_name: String,
    pub items: Vec<LineItem>,
    /// Bill against percent-complete instead of raw quantity × rate.
    pub progress_billing: bool,
    pub discount: f64,
    pub tax_rate: f64,
    pub shipping: f64,
    pub payment_terms: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Estimate {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub estimate_number: String,
    pub valid_until: String,
    pub project_name: String,
    pub items: Vec<LineItem>,
    pub discount: f64,
    pub tax_rate: f64,
    pub shipping: f64,
    pub notes: String,
    pub client_signature: Option<String>,
    pub client_signed_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangeOrder {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub change_order_number: String,
    pub project_name: String,
    pub reason: String,
    pub items: Vec<LineItem>,
    pub discount: f64,
    pub tax_rate: f64,
    /// Additional working days caused by the change; `0` means none.
    pub schedule_impact_days: i32,
    pub client_signature: Option<String>,
    pub client_signed_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PurchaseOrder {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub po_number: String,
    pub delivery_date: String,
    pub delivery_address: String,
    pub items: Vec<LineItem>,
    pub discount: f64,
    pub tax_rate: f64,
    pub shipping: f64,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Receipt {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub receipt_number: String,
    pub payment_method: String,
    pub items: Vec<LineItem>,
    pub discount: f64,
    pub tax_rate: f64,
    pub amount_paid: Option<f64>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkOrder {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub work_order_number: String,
    pub job_address: String,
    pub scheduled_date: String,
    pub assigned_to: String,
    pub status: String,
    pub priority: String,
    /// Scope of work as rich text.
    pub description: String,
    pub tasks: Vec<LineItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeEntry {
    pub date: String,
    pub project: String,
    pub description: String,
    pub hours: f64,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeSheet {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub sheet_number: String,
    pub employee_name: String,
    pub period_start: String,
    pub period_end: String,
    pub entries: Vec<TimeEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaterialEntry {
    pub date: String,
    pub material: String,
    pub supplier: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaterialLog {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub log_number: String,
    pub project_name: String,
    pub entries: Vec<MaterialEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpenseEntry {
    pub date: String,
    pub category: String,
    pub vendor: String,
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpenseLog {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub log_number: String,
    pub period: String,
    pub entries: Vec<ExpenseEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Warranty {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub warranty_number: String,
    pub project_name: String,
    pub coverage_start: String,
    pub coverage_end: String,
    /// Rich text.
    pub terms: String,
    /// Rich text.
    pub exclusions: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DailyReport {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub report_number: String,
    pub project_name: String,
    pub weather: String,
    pub crew_count: u32,
    pub hours_worked: f64,
    /// Rich text.
    pub work_performed: String,
    /// Rich text.
    pub issues: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Note {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub note_number: String,
    pub title: String,
    /// Rich text.
    pub content: String,
}

/// Every document the suite can render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DocumentRecord {
    Invoice(Invoice),
    Estimate(Estimate),
    WorkOrder(WorkOrder),
    TimeSheet(TimeSheet),
    MaterialLog(MaterialLog),
    Receipt(Receipt),
    Warranty(Warranty),
    ChangeOrder(ChangeOrder),
    PurchaseOrder(PurchaseOrder),
    DailyReport(DailyReport),
    ExpenseLog(ExpenseLog),
    Note(Note),
}

impl DocumentRecord {
    pub fn header(&self) -> &DocumentHeader {
        match self {
            DocumentRecord::Invoice(d) => &d.header,
            DocumentRecord::Estimate(d) => &d.header,
            DocumentRecord::WorkOrder(d) => &d.header,
            DocumentRecord::TimeSheet(d) => &d.header,
            DocumentRecord::MaterialLog(d) => &d.header,
            DocumentRecord::Receipt(d) => &d.header,
            DocumentRecord::Warranty(d) => &d.header,
            DocumentRecord::ChangeOrder(d) => &d.header,
            DocumentRecord::PurchaseOrder(d) => &d.header,
            DocumentRecord::DailyReport(d) => &d.header,
            DocumentRecord::ExpenseLog(d) => &d.header,
            DocumentRecord::Note(d) => &d.header,
        }
    }

    /// Human-readable kind, used for titles and output file names.
    pub fn type_name(&self) -> &'static str {
        match self {
            DocumentRecord::Invoice(_) => "Invoice",
            DocumentRecord::Estimate(_) => "Estimate",
            DocumentRecord::WorkOrder(_) => "WorkOrder",
            DocumentRecord::TimeSheet(_) => "TimeSheet",
            DocumentRecord::MaterialLog(_) => "MaterialLog",
            DocumentRecord::Receipt(_) => "Receipt",
            DocumentRecord::Warranty(_) => "Warranty",
            DocumentRecord::ChangeOrder(_) => "ChangeOrder",
            DocumentRecord::PurchaseOrder(_) => "PurchaseOrder",
            DocumentRecord::DailyReport(_) => "DailyReport",
            DocumentRecord::ExpenseLog(_) => "ExpenseLog",
            DocumentRecord::Note(_) => "Note",
        }
    }

    /// The identifying field of each kind (invoice number, PO number, ...).
    pub fn primary_id(&self) -> &str {
        match self {
            DocumentRecord::Invoice(d) => &d.invoice_number,
            DocumentRecord::Estimate(d) => &d.estimate_number,
            DocumentRecord::WorkOrder(d) => &d.work_order_number,
            DocumentRecord::TimeSheet(d) => &d.sheet_number,
            DocumentRecord::MaterialLog(d) => &d.log_number,
            DocumentRecord::Receipt(d) => &d.receipt_number,
            DocumentRecord::Warranty(d) => &d.warranty_number,
            DocumentRecord::ChangeOrder(d) => &d.change_order_number,
            DocumentRecord::PurchaseOrder(d) => &d.po_number,
            DocumentRecord::DailyReport(d) => &d.report_number,
            DocumentRecord::ExpenseLog(d) => &d.log_number,
            DocumentRecord::Note(d) => &d.note_number,
        }
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
