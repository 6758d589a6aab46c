pub mod cli;
pub mod controller;
pub mod gateway;
pub mod io;
pub mod model;
pub mod ops;
pub mod session;
