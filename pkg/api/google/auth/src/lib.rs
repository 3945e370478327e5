#![feature(inherent_associated_types)]

#[macro_use]
extern crate common;

#[macro_use]
extern crate macros;

mod constants;
mod jwt;
mod oauth;
mod provider;
mod rest;
mod service_account;

pub use crate::jwt::*;
pub use crate::oauth::*;
pub use crate::rest::*;
pub use crate::service_account::*;
