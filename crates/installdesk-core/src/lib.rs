//! Core types and computations for InstallDesk.
//!
//! This crate has no I/O. It holds:
//! - the persisted entities and their insert/patch payloads ([`model`])
//! - identity and row visibility ([`access`])
//! - form validation run before any write ([`validation`])
//! - the aggregation layer: installation scheduling ([`schedule`]), payment
//!   reconciliation ([`balance`]), revenue rollups ([`sales`]), the dashboard
//!   summary ([`dashboard`]) and the month grid ([`calendar`])
//! - configuration loaded by the binary ([`config`])

pub mod access;
pub mod balance;
pub mod calendar;
pub mod config;
pub mod dashboard;
pub mod model;
pub mod sales;
pub mod schedule;
pub mod validation;

pub use access::{AccessError, Identity, RowScope};
pub use balance::{OrderBalance, outstanding, outstanding_orders, overpayment, total_paid};
pub use calendar::{CalendarDay, CalendarEntry, CalendarMonth, calendar_month};
pub use config::{AppConfig, ConfigError};
pub use dashboard::{DashboardOptions, DashboardSummary, dashboard_summary};
pub use model::{
    Client, ClientPatch, NewClient, NewOrder, NewPayment, Order, OrderPatch, OrderStatus,
    OrderWithClient, Payment, PaymentFilter, PaymentMethod, PaymentPatch, ProfileUpdate, Role,
    UserProfile, display_name,
};
pub use sales::{MonthlySales, UserSales, YearMonth, monthly_sales_per_user};
pub use schedule::{
    ScheduledOrder, compute_installation_date, derive_lead_time, overdue_orders, upcoming_orders,
};
pub use validation::{Validate, ValidationErrors};
