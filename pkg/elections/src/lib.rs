#[macro_use] extern crate serde_derive;
#[macro_use] extern crate error_chain;
#[macro_use] extern crate log;

extern crate bytes;
extern crate rmp_serde as rmps;
extern crate serde;

pub mod errors {
	error_chain! {
		foreign_links {
			Encode(rmp_serde::encode::Error);
			Decode(rmp_serde::decode::Error);
		}
	}
}

pub mod protos;
pub mod state;
pub mod elections;
pub mod ports;
pub mod bus;
pub mod wire;
