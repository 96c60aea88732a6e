pub mod bands;
pub mod compare;
pub mod fit;
pub mod series;
pub mod setup;
pub mod status;
pub mod ui;
