//! For each u64 provided as an argument on the command line, print the varint representation as
//! bytes.

use varbuf::Packable;

fn main() {
    for argument in std::env::args().skip(1) {
        let x = match argument.parse::<u64>() {
            Ok(x) => x,
            Err(e) => {
                eprintln!("don't know how to parse {argument}: {e}");
                continue;
            }
        };
        let v: varbuf::v64 = x.into();
        let mut buf = [0u8; 10];
        let pa = varbuf::stack_pack(v);
        let buf: &[u8] = pa.into_slice(&mut buf);
        println!("{buf:?}");
    }
}
