//! Fixed-width primitives over any byte source or sink.
//!
//! Byte order is picked per call, since one bundle mixes little and big endian substructures:
//!
//! ```
//! use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
//!
//! let mut input: &[u8] = &[1, 0, 0, 0, 0, 0, 0, 2];
//! assert_eq!(input.read_u32::<LittleEndian>().unwrap(), 1);
//! assert_eq!(input.read_u32::<BigEndian>().unwrap(), 2);
//! ```

use std::io::{self, Read, Write};

use byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt};
use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

fn read_floats<R: Read + ?Sized, B: ByteOrder, const N: usize>(
    reader: &mut R,
) -> io::Result<[f32; N]> {
    let mut values = [0.0; N];
    reader.read_f32_into::<B>(&mut values)?;
    Ok(values)
}

fn write_floats<W: Write + ?Sized, B: ByteOrder>(writer: &mut W, values: &[f32]) -> io::Result<()> {
    values.iter().try_for_each(|&v| writer.write_f32::<B>(v))
}

/// Reads on top of [`ReadBytesExt`]'s integers and floats. A short read is
/// `io::ErrorKind::UnexpectedEof`.
pub trait BinaryRead: Read {
    fn read_vec2<B: ByteOrder>(&mut self) -> io::Result<Vec2> {
        read_floats::<_, B, 2>(self).map(Vec2::from_array)
    }

    fn read_vec3<B: ByteOrder>(&mut self) -> io::Result<Vec3> {
        read_floats::<_, B, 3>(self).map(Vec3::from_array)
    }

    fn read_vec4<B: ByteOrder>(&mut self) -> io::Result<Vec4> {
        read_floats::<_, B, 4>(self).map(Vec4::from_array)
    }

    /// x, y, z, w
    fn read_quat<B: ByteOrder>(&mut self) -> io::Result<Quat> {
        read_floats::<_, B, 4>(self).map(Quat::from_array)
    }

    /// Column-major
    fn read_mat3<B: ByteOrder>(&mut self) -> io::Result<Mat3> {
        read_floats::<_, B, 9>(self).map(|cols| Mat3::from_cols_array(&cols))
    }

    /// Column-major
    fn read_mat4<B: ByteOrder>(&mut self) -> io::Result<Mat4> {
        read_floats::<_, B, 16>(self).map(|cols| Mat4::from_cols_array(&cols))
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut bytes = [0; N];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut bytes = vec![0; len];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Reads up to a zero byte, consuming it. Each byte is one Latin-1 character.
    fn read_cstring(&mut self) -> io::Result<String> {
        let mut value = String::new();
        loop {
            match self.read_u8()? {
                0 => return Ok(value),
                b => value.push(char::from(b)),
            }
        }
    }
}

impl<R: Read + ?Sized> BinaryRead for R {}

/// Mirror of [`BinaryRead`]
pub trait BinaryWrite: Write {
    fn write_vec2<B: ByteOrder>(&mut self, v: Vec2) -> io::Result<()> {
        write_floats::<_, B>(self, &v.to_array())
    }

    fn write_vec3<B: ByteOrder>(&mut self, v: Vec3) -> io::Result<()> {
        write_floats::<_, B>(self, &v.to_array())
    }

    fn write_vec4<B: ByteOrder>(&mut self, v: Vec4) -> io::Result<()> {
        write_floats::<_, B>(self, &v.to_array())
    }

    fn write_quat<B: ByteOrder>(&mut self, q: Quat) -> io::Result<()> {
        write_floats::<_, B>(self, &q.to_array())
    }

    fn write_mat3<B: ByteOrder>(&mut self, m: Mat3) -> io::Result<()> {
        write_floats::<_, B>(self, &m.to_cols_array())
    }

    fn write_mat4<B: ByteOrder>(&mut self, m: Mat4) -> io::Result<()> {
        write_floats::<_, B>(self, &m.to_cols_array())
    }

    /// String bytes then a zero. Only Latin-1 without interior NULs can round trip.
    fn write_cstring(&mut self, value: &str) -> io::Result<()> {
        let bytes = value
            .chars()
            .map(|c| match u8::try_from(c) {
                Ok(0) | Err(_) => Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Can't write {c:?} into a null-terminated Latin-1 string"),
                )),
                Ok(b) => Ok(b),
            })
            .collect::<io::Result<Vec<u8>>>()?;

        self.write_all(&bytes)?;
        self.write_u8(0)
    }
}

impl<W: Write + ?Sized> BinaryWrite for W {}
