pub mod controls;
pub mod regions;
