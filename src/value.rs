/// Fixed-width integers stored little-endian in an address space.
///
/// Byte `i` of a value lives at `address + i`. Conversions go through `u64`;
/// narrower reads zero-extend.
pub trait LeValue: Copy {
    const WIDTH: usize;

    fn to_le_u64(self) -> u64;

    fn from_le_u64(raw: u64) -> Self;
}

macro_rules! impl_le_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl LeValue for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn to_le_u64(self) -> u64 {
                    self as u64
                }

                fn from_le_u64(raw: u64) -> Self {
                    raw as $ty
                }
            }
        )*
    };
}

impl_le_value!(u8, u16, u32, u64, i8, i16, i32, i64);
