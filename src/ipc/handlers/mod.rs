pub mod classes;
pub mod core;
pub mod exchange;
pub mod grouping;
pub mod history;
pub mod students;
