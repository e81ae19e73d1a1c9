pub mod approval;
pub mod employee;
pub mod offday;
pub mod salary;
pub mod shift;
