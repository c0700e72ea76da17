#![doc = include_str!("../README.md")]

use std::fmt::Debug;

mod varint;

pub use varint::v64;

/////////////////////////////////////////////// Error //////////////////////////////////////////////

/// All Error conditions within `varbuf`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// BufferTooShort indicates that there was a need to pack or unpack more bytes than were
    /// available in the underlying memory.
    BufferTooShort {
        /// Number of bytes required to read the buffer.
        required: usize,
        /// Number of bytes available to read.
        had: usize,
    },
    /// VarintOverflow indicates that a varint did not terminate within its ten-byte maximum.
    VarintOverflow {
        /// Number of bytes considered.
        bytes: usize,
    },
    /// UnsignedOverflow indicates that a value will not fit its intended (unsigned) target.
    UnsignedOverflow {
        /// Value that would overflow.
        value: u64,
    },
    /// SignedOverflow indicates that a value will not fit its intended (signed) target.
    SignedOverflow {
        /// Value that would overflow.
        value: i64,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BufferTooShort { required, had } => fmt
                .debug_struct("BufferTooShort")
                .field("required", required)
                .field("had", had)
                .finish(),
            Error::VarintOverflow { bytes } => fmt
                .debug_struct("VarintOverflow")
                .field("bytes", bytes)
                .finish(),
            Error::UnsignedOverflow { value } => fmt
                .debug_struct("UnsignedOverflow")
                .field("value", value)
                .finish(),
            Error::SignedOverflow { value } => fmt
                .debug_struct("SignedOverflow")
                .field("value", value)
                .finish(),
        }
    }
}

///////////////////////////////////////////// Packable /////////////////////////////////////////////

/// Packable objects can be serialized into an `&mut [u8]`.
///
/// The actual serialized form of the object is left unspecified by the Packable trait.
///
/// Packable objects should avoid interior mutability to the extent necessary to ensure that anyone
/// holding an immutable reference can assume the packed output will not change for the duration of
/// the reference.
pub trait Packable {
    /// `pack_sz` returns the number of bytes required to serialize the Packable object.
    fn pack_sz(&self) -> usize;
    /// `pack` fills in the buffer `out` with the packed binary representation of the Packable
    /// object.  The implementor is responsible to ensure that `out` is exactly `pack_sz()` bytes
    /// and implementations are encouraged to assert this.
    ///
    /// The call to pack should never fail.  A well-formed Packable that can be represented will
    /// serialize successfully.  If there is a need to represent a state that cannot exist, it
    /// should be done using a different type that does not implement Packable.
    ///
    /// # Panics
    ///
    /// - When `out.len() != self.pack_sz()`
    fn pack(&self, out: &mut [u8]);
}

//////////////////////////////////////////// Unpackable ////////////////////////////////////////////

/// Unpackable objects can be deserialized from an `&[u8]`.
///
/// The format understood by `T:Unpackable` must correspond to the format serialized by
/// `T:Packable`.
pub trait Unpackable<'a>: Sized {
    /// Type of error this unpackable returns.
    type Error: Debug;

    /// `unpack` attempts to return an Unpackable object stored in a prefix of `buf`.  The method
    /// returns the result and remaining unused buffer.
    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Self::Error>;
}

//////////////////////////////////////////// pack_helper ///////////////////////////////////////////

/// `pack_helper` takes a Packable object and an `&mut [u8]` and does the work to serialize the
/// packable into a prefix of the buffer.  The return value is the portion of the buffer that
/// remains unfilled after this operation.
pub fn pack_helper<T: Packable>(t: T, buf: &mut [u8]) -> &mut [u8] {
    let sz: usize = t.pack_sz();
    assert!(sz <= buf.len(), "packers should never be given short space");
    t.pack(&mut buf[..sz]);
    &mut buf[sz..]
}

//////////////////////////////////////////// StackPacker ///////////////////////////////////////////

const EMPTY: () = ();

/// `stack_pack` begins a tree of packable data on the stack.
pub fn stack_pack<'a, T: Packable + 'a>(t: T) -> StackPacker<'a, (), T> {
    StackPacker { prefix: &EMPTY, t }
}

/// [StackPacker] is the type returned by `stack_pack`.  It's a pointer to something packable
/// (usually another StackPacker) and some type that we can directly pack.  Both are packable, but
/// it's usually the case that the former is another StackPacker while the latter is the type being
/// serialized in a call to `pack`.
pub struct StackPacker<'a, P, T>
where
    P: Packable + 'a,
    T: Packable + 'a,
{
    prefix: &'a P,
    t: T,
}

impl<'a, P, T> StackPacker<'a, P, T>
where
    P: Packable + 'a,
    T: Packable + 'a,
{
    /// `pack` returns a new StackPacker that will pack `self` at its prefix.  This does not
    /// actually do the packing, but defers it until calls to e.g. `into_slice`.  Consequently, the
    /// object `u` must not change between this call and subsequent calls.  Rust's type system
    /// generally enforces this by default, except where interior mutability is specifically added.
    pub fn pack<'b, U: Packable + 'b>(&'b self, u: U) -> StackPacker<'b, Self, U> {
        StackPacker { prefix: self, t: u }
    }

    /// `into_slice` packs the entire chain of `pack()` calls into the provided mutable buffer.
    /// The return value is a slice containing exactly those bytes written and no more.
    pub fn into_slice<'b>(&self, buf: &'b mut [u8]) -> &'b mut [u8] {
        let len = self.pack_sz();
        assert!(buf.len() >= len);
        let buf = &mut buf[0..len];
        Packable::pack(self, buf);
        buf
    }

    /// `to_vec` allocates a new vector and packs the entire chain of `pack()` calls into it.  The
    /// return value is a `Vec<u8>` sized to exactly the packed bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        let len = self.pack_sz();
        let mut buf = vec![0u8; len];
        Packable::pack(self, &mut buf);
        buf
    }

    /// `append_to_vec` is a helper to extend a vector by the requisite size and then pack into the
    /// newly created space.
    pub fn append_to_vec(&self, v: &mut Vec<u8>) {
        let len = self.pack_sz();
        let v_sz = v.len();
        v.resize(v_sz + len, 0);
        Packable::pack(self, &mut v[v_sz..]);
    }

    /// Create a Packable object that will pack like `"<varint-length><bytes>"` where the length
    /// indicates how many bytes there are.  Nothing gets copied.  Usually this gets passed to
    /// another `stack_pack`, which will do the work.
    pub fn length_prefixed(&'a self) -> LengthPrefixer<'a, StackPacker<'a, P, T>> {
        LengthPrefixer {
            size: self.pack_sz(),
            body: self,
        }
    }
}

impl<'a, P, T> Packable for StackPacker<'a, P, T>
where
    P: Packable + 'a,
    T: Packable + 'a,
{
    fn pack_sz(&self) -> usize {
        self.prefix.pack_sz() + self.t.pack_sz()
    }

    fn pack(&self, out: &mut [u8]) {
        let (prefix, suffix): (&mut [u8], &mut [u8]) = out.split_at_mut(self.prefix.pack_sz());
        self.prefix.pack(prefix);
        self.t.pack(suffix);
    }
}

///////////////////////////////////////////// Unpacker /////////////////////////////////////////////

/// Unpacker parses a buffer start to finish.
#[derive(Clone, Default)]
pub struct Unpacker<'a> {
    buf: &'a [u8],
}

impl<'a> Unpacker<'a> {
    /// Create a new [Unpacker] that parses `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Unpack from buf into an object of type T.
    pub fn unpack<'b, E, T: Unpackable<'b, Error = E>>(&mut self) -> Result<T, E>
    where
        'a: 'b,
    {
        let (t, buf): (T, &'a [u8]) = Unpackable::unpack(self.buf)?;
        self.buf = buf;
        Ok(t)
    }

    /// Return true if and only if there's no buffer left to parse.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Return the remaining buffer.
    pub fn remain(&self) -> &'a [u8] {
        self.buf
    }

    /// Advance the buffer by `by`.  Saturating.
    pub fn advance(&mut self, by: usize) {
        if by > self.buf.len() {
            self.buf = &[];
        } else {
            self.buf = &self.buf[by..];
        }
    }
}

////////////////////////////////////////// Packable for &P /////////////////////////////////////////

impl<P: Packable> Packable for &P {
    fn pack_sz(&self) -> usize {
        (*self).pack_sz()
    }

    fn pack(&self, out: &mut [u8]) {
        (*self).pack(out)
    }
}

////////////////////////////////////////// Packable for () /////////////////////////////////////////

impl Packable for () {
    fn pack_sz(&self) -> usize {
        0
    }

    fn pack(&self, _: &mut [u8]) {}
}

////////////////////////////// Packable/Unpackable for sized integers //////////////////////////////

macro_rules! packable_with_to_le_bytes {
    ($what:ty) => {
        impl Packable for $what {
            fn pack_sz(&self) -> usize {
                self.to_le_bytes().len()
            }

            fn pack(&self, out: &mut [u8]) {
                let b = &self.to_le_bytes();
                assert_eq!(b.len(), out.len());
                out.copy_from_slice(b);
            }
        }

        impl<'a> Unpackable<'a> for $what {
            type Error = Error;

            fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
                const SZ: usize = std::mem::size_of::<$what>();
                if buf.len() >= SZ {
                    let mut fbuf: [u8; SZ] = [0; SZ];
                    fbuf.copy_from_slice(&buf[0..SZ]);
                    Ok((<$what>::from_le_bytes(fbuf), &buf[SZ..]))
                } else {
                    Err(Error::BufferTooShort {
                        required: SZ,
                        had: buf.len(),
                    })
                }
            }
        }
    };
}

packable_with_to_le_bytes!(u32);
packable_with_to_le_bytes!(u64);

////////////////////////////////////////// LengthPrefixer //////////////////////////////////////////

/// A type that packs another packable behind a varint length prefix.
pub struct LengthPrefixer<'a, P>
where
    P: Packable + 'a,
{
    // memoized body.pack_sz
    size: usize,
    body: &'a P,
}

impl<'a, P> Packable for LengthPrefixer<'a, P>
where
    P: Packable + 'a,
{
    fn pack_sz(&self) -> usize {
        let vsz: v64 = self.size.into();
        vsz.pack_sz() + self.size
    }

    fn pack(&self, out: &mut [u8]) {
        let vsz: v64 = self.size.into();
        let (prefix, suffix): (&mut [u8], &mut [u8]) = out.split_at_mut(vsz.pack_sz());
        vsz.pack(prefix);
        self.body.pack(suffix);
    }
}

/////////////////////////////////////////////// &[u8] //////////////////////////////////////////////

impl Packable for &[u8] {
    fn pack_sz(&self) -> usize {
        let vsz: v64 = self.len().into();
        vsz.pack_sz() + self.len()
    }

    fn pack(&self, out: &mut [u8]) {
        let vsz: v64 = self.len().into();
        let (prefix, suffix): (&mut [u8], &mut [u8]) = out.split_at_mut(vsz.pack_sz());
        vsz.pack(prefix);
        suffix.copy_from_slice(self);
    }
}

impl<'a> Unpackable<'a> for &'a [u8] {
    type Error = Error;

    fn unpack<'b: 'a>(buf: &'b [u8]) -> Result<(Self, &'b [u8]), Error> {
        let (vsz, buf): (v64, &'b [u8]) = v64::unpack(buf)?;
        let x: usize = vsz.into();
        if x > buf.len() {
            Err(Error::BufferTooShort {
                required: x,
                had: buf.len(),
            })
        } else {
            Ok((&buf[0..x], &buf[x..]))
        }
    }
}

///////////////////////////////////////////// mod tests ////////////////////////////////////////////
