pub mod inventory;
pub mod restructure;
pub mod status;
