pub mod casino;
pub mod ledger;
pub mod presenter;
pub mod registry;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

mod layer;

pub use layer::{AutoPlaySummary, Casino, Context, Error, Settings};
pub use ledger::{Ledger, LedgerError, Memory};
pub use presenter::{PresentError, Presenter};
