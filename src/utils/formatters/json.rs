use serde::Serialize;
use std::io::Write;

use super::Result;

/// One compact JSON document per line, in iteration order.
pub fn write_json_lines<W, T, I>(writer: &mut W, items: I) -> Result
where
    W: Write,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    for item in items {
        write_json(writer, &item)?;
    }
    Ok(())
}

pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> Result {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    Ok(())
}
