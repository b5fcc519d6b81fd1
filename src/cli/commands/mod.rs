pub mod campaigns;
pub mod config;
pub mod run;
pub mod serve;
