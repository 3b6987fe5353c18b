pub mod controller;