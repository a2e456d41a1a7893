// Each test binary uses a different slice of these helpers
#![allow(dead_code)]

pub mod factories;
pub mod fakes;
pub mod helpers;
