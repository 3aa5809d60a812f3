pub mod observers;
pub mod pipes;
pub mod shapes;
