#[macro_use]
extern crate common;
extern crate http;
#[macro_use]
extern crate macros;
extern crate google;
extern crate protobuf;
extern crate raft;
extern crate rpc;
extern crate rpc_util;
extern crate sstable;

pub mod key_encoding;
pub mod meta;
pub mod proto;
