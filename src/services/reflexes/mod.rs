//! Reflex controllers: self-contained units each owning one piece of
//! homeostatic behavior (hunger, exploration, sleep).

pub mod exploration;
pub mod food;
pub mod hunger;
pub mod sleep;
