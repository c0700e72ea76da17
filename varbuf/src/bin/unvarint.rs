//! Decode one varint from the bytes provided on the command line and print the u64 it encodes.
//! Provide the bytes in base 10, one argument per byte.

use varbuf::Unpackable;

fn main() {
    let mut bytes = Vec::new();
    for argument in std::env::args().skip(1) {
        let x = match argument.parse::<u8>() {
            Ok(x) => x,
            Err(e) => {
                eprintln!("don't know how to parse {argument}: {e}");
                std::process::exit(1);
            }
        };
        bytes.push(x);
    }
    match varbuf::v64::unpack(&bytes) {
        Ok((v, _)) => {
            let v: u64 = v.into();
            println!("{v}");
        }
        Err(e) => {
            eprintln!("don't know how to decode those bytes: {e}");
            std::process::exit(1);
        }
    }
}
