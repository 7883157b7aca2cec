//! Domain models for the clinrec system.

mod assignment;
mod clinical_data;
mod history;
mod notification;
mod user;

pub use assignment::*;
pub use clinical_data::*;
pub use history::*;
pub use notification::*;
pub use user::*;
