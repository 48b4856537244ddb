/*++

Licensed under the Apache-2.0 license.

File Name:

    printer.rs

Abstract:

    File contains support routines and macros to print to the debug log

--*/
use core::convert::Infallible;
use ufmt::{uDisplay, uWrite};

#[derive(Default)]
pub struct Printer;

impl uWrite for Printer {
    type Error = Infallible;

    /// Writes a string slice into this writer, returning whether the write succeeded.
    ///
    /// The debug UART belongs to the board support code; without it the log
    /// is discarded.
    #[cfg(not(feature = "std"))]
    #[inline(never)]
    fn write_str(&mut self, _str: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Writes a string slice into this writer, returning whether the write succeeded.
    #[cfg(feature = "std")]
    fn write_str(&mut self, str: &str) -> Result<(), Self::Error> {
        print!("{str}");
        Ok(())
    }
}

#[macro_export]
macro_rules! cprint {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwrite!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

#[macro_export]
macro_rules! cprintln {
    ($($tt:tt)*) => {{
        let _ = ufmt::uwriteln!(&mut $crate::printer::Printer::default(), $($tt)*);
    }}
}

/// Prints 32-bit words as packed little-endian ASCII, stopping at the first NUL.
///
/// CDO log strings and begin labels are carried this way.
pub struct WordStr<'a>(pub &'a [u32]);
impl uDisplay for WordStr<'_> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        for word in self.0.iter() {
            for &b in word.to_le_bytes().iter() {
                if b == 0 {
                    return Ok(());
                }
                if b.is_ascii_graphic() || b == b' ' {
                    f.write_char(b as char)?;
                } else {
                    f.write_char('.')?;
                }
            }
        }
        Ok(())
    }
}

pub struct HexWords<'a>(pub &'a [u32]);
impl uDisplay for HexWords<'_> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        for (i, &x) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_char(' ')?;
            }
            for shift in (0..8).rev() {
                let c = ((x >> (shift * 4)) & 0xf) as u8;
                if c < 10 {
                    f.write_char((c + b'0') as char)?;
                } else {
                    f.write_char((c - 10 + b'A') as char)?;
                }
            }
        }
        Ok(())
    }
}
