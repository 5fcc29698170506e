pub mod alert_log;
pub mod dispatcher;
pub mod notifier;
pub mod report;
pub mod sheet;

pub use alert_log::JsonlAlertLog;
pub use dispatcher::{
    AlertDispatcher, AlertStore, DispatchOutcome, NotificationSink, SheetSink, SinkOutcome,
};
pub use notifier::Notifier;
pub use sheet::SheetWebhook;
