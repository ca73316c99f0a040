pub mod entries;
pub mod transfers;
