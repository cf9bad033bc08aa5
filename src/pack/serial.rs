//! Decoder for the Java object serialization stream protocol (version 5).
//!
//! Pack files are produced by `java.io.ObjectOutputStream`. Primitive writes
//! such as the record count, and the raw file payloads, travel as *block
//! data*: runs of bytes framed by `TC_BLOCKDATA` / `TC_BLOCKDATALONG`
//! headers. Each file header is a serialized object graph. [`ObjectStream`]
//! exposes both halves of the protocol:
//!
//! - [`ObjectStream::read_block`] / [`ObjectStream::read_int`] consume block
//!   data, transparently crossing segment boundaries.
//! - [`ObjectStream::read_object`] decodes one object graph into a [`Value`].
//!
//! Objects are decoded structurally from the class descriptors carried in the
//! stream itself, so fields that are never persisted simply do not appear and
//! classes with custom write methods (lists, maps) keep their annotation data.
//!
//! ## Handles
//!
//! Every class descriptor, string, object, array, enum constant and class
//! object gets the next handle (starting at [`BASE_WIRE_HANDLE`]) in stream
//! order. `TC_REFERENCE` points back at one of them. `TC_RESET` clears the
//! table.

use std::io::{self, Read};
use std::rc::Rc;

use byteorder::{BigEndian, ReadBytesExt};
use log::trace;

use super::error::{DecodeError, Result, truncated};

pub const STREAM_MAGIC: u16 = 0xACED;
pub const STREAM_VERSION: u16 = 5;

pub const TC_NULL: u8 = 0x70;
pub const TC_REFERENCE: u8 = 0x71;
pub const TC_CLASSDESC: u8 = 0x72;
pub const TC_OBJECT: u8 = 0x73;
pub const TC_STRING: u8 = 0x74;
pub const TC_ARRAY: u8 = 0x75;
pub const TC_CLASS: u8 = 0x76;
pub const TC_BLOCKDATA: u8 = 0x77;
pub const TC_ENDBLOCKDATA: u8 = 0x78;
pub const TC_RESET: u8 = 0x79;
pub const TC_BLOCKDATALONG: u8 = 0x7A;
pub const TC_EXCEPTION: u8 = 0x7B;
pub const TC_LONGSTRING: u8 = 0x7C;
pub const TC_PROXYCLASSDESC: u8 = 0x7D;
pub const TC_ENUM: u8 = 0x7E;

pub const SC_WRITE_METHOD: u8 = 0x01;
pub const SC_SERIALIZABLE: u8 = 0x02;
pub const SC_EXTERNALIZABLE: u8 = 0x04;
pub const SC_BLOCK_DATA: u8 = 0x08;
pub const SC_ENUM: u8 = 0x10;

pub const BASE_WIRE_HANDLE: u32 = 0x7E0000;

/// Maximum nesting of objects, arrays and class descriptors.
pub const MAX_DEPTH: usize = 64;

/// A decoded stream value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Byte(i8),
    Char(u16),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
    String(Rc<str>),
    Object(Rc<Object>),
    Array(Rc<Array>),
    Enum(Rc<EnumConstant>),
    Class(Rc<ClassDesc>),
    /// Back-reference to an object whose decoding has not finished (a cycle).
    Pending(u32),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Byte(_) => "byte",
            Value::Char(_) => "char",
            Value::Double(_) => "double",
            Value::Float(_) => "float",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Short(_) => "short",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Enum(_) => "enum",
            Value::Class(_) => "class",
            Value::Pending(_) => "cyclic reference",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumConstant> {
        match self {
            Value::Enum(constant) => Some(constant),
            _ => None,
        }
    }

    /// Integral value widened to `i64`.
    pub fn as_long(&self) -> Option<i64> {
        match *self {
            Value::Byte(v) => Some(v as i64),
            Value::Short(v) => Some(v as i64),
            Value::Int(v) => Some(v as i64),
            Value::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(v) => Some(v),
            _ => None,
        }
    }
}

/// Serialized field descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDesc {
    /// One of `B C D F I J S Z` for primitives, `L` or `[` for references.
    pub type_code: char,
    pub name: String,
    /// JVM type signature of reference fields, e.g. `Ljava/lang/String;`.
    pub class_name: Option<Rc<str>>,
}

/// Serialized class descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDesc {
    pub name: String,
    pub serial_version_uid: i64,
    pub flags: u8,
    pub fields: Vec<FieldDesc>,
    pub super_class: Option<Rc<ClassDesc>>,
}

impl ClassDesc {
    pub fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    /// Class name without its package.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// The class chain from the top-most serializable superclass down to `self`.
    pub fn hierarchy(self: &Rc<Self>) -> Vec<Rc<ClassDesc>> {
        let mut chain = vec![self.clone()];
        let mut current = self.super_class.clone();
        while let Some(desc) = current {
            current = desc.super_class.clone();
            chain.push(desc);
        }
        chain.reverse();
        chain
    }
}

/// Field values and annotation written for one class of an object's hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassData {
    pub class_name: String,
    pub fields: Vec<(String, Value)>,
    /// Extra data written by a custom `writeObject`, up to `TC_ENDBLOCKDATA`.
    pub annotation: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Block(Vec<u8>),
    Content(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub class: Rc<ClassDesc>,
    /// One entry per class of the hierarchy, top-most superclass first.
    pub class_data: Vec<ClassData>,
}

impl Object {
    /// Looks a field up, most derived class first.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.class_data.iter().rev().find_map(|data| {
            data.fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value)
        })
    }

    /// Objects written into the annotations of any class of the hierarchy.
    pub fn annotated_values(&self) -> impl Iterator<Item = &Value> {
        self.class_data
            .iter()
            .flat_map(|data| data.annotation.iter())
            .filter_map(|item| match item {
                Annotation::Content(value) => Some(value),
                Annotation::Block(_) => None,
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub class: Rc<ClassDesc>,
    pub elements: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumConstant {
    pub class: Rc<ClassDesc>,
    pub name: Rc<str>,
}

#[derive(Debug, Clone)]
enum Slot {
    Pending,
    Class(Rc<ClassDesc>),
    Value(Value),
}

/// Forward-only reader over a serialization stream.
pub struct ObjectStream<R: Read> {
    inner: R,
    /// Tag byte read while probing for block data but not yet consumed.
    peeked: Option<u8>,
    /// Unread bytes of the current block data segment.
    block_remaining: usize,
    handles: Vec<Slot>,
}

impl<R: Read> ObjectStream<R> {
    /// Reads and validates the stream header.
    pub fn new(mut inner: R) -> Result<Self> {
        let magic = inner.read_u16::<BigEndian>().map_err(truncated)?;
        if magic != STREAM_MAGIC {
            return Err(DecodeError::BadMagic(magic).into());
        }
        let version = inner.read_u16::<BigEndian>().map_err(truncated)?;
        if version != STREAM_VERSION {
            return Err(DecodeError::UnsupportedVersion(version).into());
        }

        Ok(Self {
            inner,
            peeked: None,
            block_remaining: 0,
            handles: Vec::new(),
        })
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads block data into `buf`.
    ///
    /// Returns `Ok(0)` once the block data run ends (the next item is an
    /// object) or the underlying source is exhausted.
    pub fn read_block(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.block_remaining == 0 && !self.next_block()? {
            return Ok(0);
        }

        let want = buf.len().min(self.block_remaining);
        let n = loop {
            match self.inner.read(&mut buf[..want]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        self.block_remaining -= n;
        Ok(n)
    }

    /// Fills `buf` from block data, failing if the run ends early.
    pub fn read_block_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_block(&mut buf[filled..])?;
            if n == 0 {
                return Err(DecodeError::UnexpectedEof.into());
            }
            filled += n;
        }
        Ok(())
    }

    /// Reads a big-endian `int` from block data (`ObjectInputStream.readInt`).
    pub fn read_int(&mut self) -> Result<i32> {
        let mut bytes = [0u8; 4];
        self.read_block_exact(&mut bytes)?;
        Ok(i32::from_be_bytes(bytes))
    }

    /// Decodes the next top-level object.
    pub fn read_object(&mut self) -> Result<Value> {
        if self.block_remaining > 0 {
            return Err(DecodeError::UnexpectedBlockData(self.block_remaining).into());
        }
        loop {
            let tag = self.u8()?;
            match tag {
                TC_RESET => self.reset(),
                TC_BLOCKDATA => {
                    let len = self.u8()? as usize;
                    return Err(DecodeError::UnexpectedBlockData(len).into());
                }
                TC_BLOCKDATALONG => {
                    let len = self.i32()?;
                    return Err(DecodeError::UnexpectedBlockData(len.max(0) as usize).into());
                }
                _ => return self.content(tag, 0),
            }
        }
    }

    fn reset(&mut self) {
        trace!("stream reset, dropping {} handles", self.handles.len());
        self.handles.clear();
    }

    /// Positions the stream inside the next block data segment.
    fn next_block(&mut self) -> Result<bool> {
        loop {
            let Some(tag) = self.peek()? else {
                return Ok(false);
            };
            match tag {
                TC_BLOCKDATA => {
                    self.peeked = None;
                    let len = self.u8()? as usize;
                    if len > 0 {
                        self.block_remaining = len;
                        return Ok(true);
                    }
                }
                TC_BLOCKDATALONG => {
                    self.peeked = None;
                    let len = self.i32()?;
                    if len < 0 {
                        return Err(DecodeError::NegativeLength(len as i64).into());
                    }
                    if len > 0 {
                        self.block_remaining = len as usize;
                        return Ok(true);
                    }
                }
                TC_RESET => {
                    self.peeked = None;
                    self.reset();
                }
                _ => return Ok(false),
            }
        }
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        if self.peeked.is_none() {
            let mut byte = [0u8; 1];
            let n = loop {
                match self.inner.read(&mut byte) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            };
            if n == 0 {
                return Ok(None);
            }
            self.peeked = Some(byte[0]);
        }
        Ok(self.peeked)
    }

    fn u8(&mut self) -> Result<u8> {
        match self.peeked.take() {
            Some(byte) => Ok(byte),
            None => self.inner.read_u8().map_err(truncated),
        }
    }

    // Multi-byte reads only ever follow a consumed tag byte.
    fn u16(&mut self) -> Result<u16> {
        debug_assert!(self.peeked.is_none());
        self.inner.read_u16::<BigEndian>().map_err(truncated)
    }

    fn i16(&mut self) -> Result<i16> {
        debug_assert!(self.peeked.is_none());
        self.inner.read_i16::<BigEndian>().map_err(truncated)
    }

    fn i32(&mut self) -> Result<i32> {
        debug_assert!(self.peeked.is_none());
        self.inner.read_i32::<BigEndian>().map_err(truncated)
    }

    fn i64(&mut self) -> Result<i64> {
        debug_assert!(self.peeked.is_none());
        self.inner.read_i64::<BigEndian>().map_err(truncated)
    }

    fn f32(&mut self) -> Result<f32> {
        debug_assert!(self.peeked.is_none());
        self.inner.read_f32::<BigEndian>().map_err(truncated)
    }

    fn f64(&mut self) -> Result<f64> {
        debug_assert!(self.peeked.is_none());
        self.inner.read_f64::<BigEndian>().map_err(truncated)
    }

    fn bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        debug_assert!(self.peeked.is_none());
        let mut buf = Vec::new();
        (&mut self.inner).take(len).read_to_end(&mut buf)?;
        if (buf.len() as u64) < len {
            return Err(DecodeError::UnexpectedEof.into());
        }
        Ok(buf)
    }

    fn utf(&mut self) -> Result<String> {
        let len = self.u16()? as u64;
        let bytes = self.bytes(len)?;
        Ok(decode_modified_utf8(&bytes)?)
    }

    fn long_utf(&mut self) -> Result<String> {
        let len = self.i64()?;
        if len < 0 {
            return Err(DecodeError::NegativeLength(len).into());
        }
        let bytes = self.bytes(len as u64)?;
        Ok(decode_modified_utf8(&bytes)?)
    }

    fn reserve(&mut self) -> usize {
        self.handles.push(Slot::Pending);
        self.handles.len() - 1
    }

    fn assign(&mut self, index: usize, slot: Slot) {
        if let Some(entry) = self.handles.get_mut(index) {
            *entry = slot;
        }
    }

    fn resolve(&self, handle: u32) -> Result<&Slot> {
        handle
            .checked_sub(BASE_WIRE_HANDLE)
            .and_then(|index| self.handles.get(index as usize))
            .ok_or_else(|| DecodeError::InvalidHandle(handle).into())
    }

    fn reference(&mut self) -> Result<Value> {
        let handle = self.i32()? as u32;
        Ok(match self.resolve(handle)? {
            Slot::Pending => Value::Pending(handle),
            Slot::Class(desc) => Value::Class(desc.clone()),
            Slot::Value(value) => value.clone(),
        })
    }

    fn content(&mut self, tag: u8, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::TooDeep(MAX_DEPTH).into());
        }
        match tag {
            TC_NULL => Ok(Value::Null),
            TC_REFERENCE => self.reference(),
            TC_OBJECT => self.new_object(depth),
            TC_STRING => {
                let s = self.utf()?;
                Ok(Value::String(self.new_string(s)))
            }
            TC_LONGSTRING => {
                let s = self.long_utf()?;
                Ok(Value::String(self.new_string(s)))
            }
            TC_ARRAY => self.new_array(depth),
            TC_ENUM => self.new_enum(depth),
            TC_CLASS => {
                let desc = self.required_class_desc(depth + 1)?;
                let index = self.reserve();
                let value = Value::Class(desc);
                self.assign(index, Slot::Value(value.clone()));
                Ok(value)
            }
            TC_CLASSDESC | TC_PROXYCLASSDESC => Ok(Value::Class(self.class_desc_body(tag, depth)?)),
            TC_EXCEPTION => {
                Err(DecodeError::Unsupported("exception written into the stream".into()).into())
            }
            TC_BLOCKDATA | TC_BLOCKDATALONG | TC_ENDBLOCKDATA | TC_RESET => {
                Err(DecodeError::UnexpectedTag {
                    tag,
                    context: "object content",
                }
                .into())
            }
            _ => Err(DecodeError::UnknownTag(tag).into()),
        }
    }

    fn new_string(&mut self, s: String) -> Rc<str> {
        let s: Rc<str> = s.into();
        let index = self.reserve();
        self.assign(index, Slot::Value(Value::String(s.clone())));
        s
    }

    fn class_desc(&mut self, depth: usize) -> Result<Option<Rc<ClassDesc>>> {
        let tag = self.u8()?;
        match tag {
            TC_NULL => Ok(None),
            TC_REFERENCE => {
                let handle = self.i32()? as u32;
                match self.resolve(handle)? {
                    Slot::Class(desc) => Ok(Some(desc.clone())),
                    _ => Err(DecodeError::InvalidHandle(handle).into()),
                }
            }
            TC_CLASSDESC | TC_PROXYCLASSDESC => self.class_desc_body(tag, depth).map(Some),
            TC_NULL..=TC_ENUM => Err(DecodeError::UnexpectedTag {
                tag,
                context: "class descriptor",
            }
            .into()),
            _ => Err(DecodeError::UnknownTag(tag).into()),
        }
    }

    fn required_class_desc(&mut self, depth: usize) -> Result<Rc<ClassDesc>> {
        self.class_desc(depth)?.ok_or_else(|| {
            DecodeError::UnexpectedTag {
                tag: TC_NULL,
                context: "class descriptor",
            }
            .into()
        })
    }

    fn class_desc_body(&mut self, tag: u8, depth: usize) -> Result<Rc<ClassDesc>> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::TooDeep(MAX_DEPTH).into());
        }

        let (index, desc) = if tag == TC_CLASSDESC {
            let name = self.utf()?;
            let serial_version_uid = self.i64()?;
            let index = self.reserve();
            let flags = self.u8()?;

            let count = self.u16()?;
            let mut fields = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let type_code = self.u8()? as char;
                let field_name = self.utf()?;
                let class_name = match type_code {
                    'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' => None,
                    'L' | '[' => Some(self.type_string()?),
                    other => return Err(DecodeError::InvalidTypeCode(other).into()),
                };
                fields.push(FieldDesc {
                    type_code,
                    name: field_name,
                    class_name,
                });
            }

            self.annotation(depth + 1)?;
            let super_class = self.class_desc(depth + 1)?;
            trace!("class {name} (suid {serial_version_uid}, flags 0x{flags:02x}, {count} fields)");

            let desc = ClassDesc {
                name,
                serial_version_uid,
                flags,
                fields,
                super_class,
            };
            (index, desc)
        } else {
            let index = self.reserve();
            let count = self.i32()?;
            if count < 0 {
                return Err(DecodeError::NegativeLength(count as i64).into());
            }
            let mut interfaces = Vec::new();
            for _ in 0..count {
                interfaces.push(self.utf()?);
            }

            self.annotation(depth + 1)?;
            let super_class = self.class_desc(depth + 1)?;

            let desc = ClassDesc {
                name: format!("proxy[{}]", interfaces.join(", ")),
                serial_version_uid: 0,
                flags: SC_SERIALIZABLE,
                fields: Vec::new(),
                super_class,
            };
            (index, desc)
        };

        let desc = Rc::new(desc);
        self.assign(index, Slot::Class(desc.clone()));
        Ok(desc)
    }

    /// Reads the class name string of a reference field descriptor.
    fn type_string(&mut self) -> Result<Rc<str>> {
        let tag = self.u8()?;
        match tag {
            TC_STRING => {
                let s = self.utf()?;
                Ok(self.new_string(s))
            }
            TC_LONGSTRING => {
                let s = self.long_utf()?;
                Ok(self.new_string(s))
            }
            TC_REFERENCE => match self.reference()? {
                Value::String(s) => Ok(s),
                other => Err(DecodeError::UnexpectedClass {
                    expected: "field type string",
                    found: other.kind().to_string(),
                }
                .into()),
            },
            TC_NULL..=TC_ENUM => Err(DecodeError::UnexpectedTag {
                tag,
                context: "field type",
            }
            .into()),
            _ => Err(DecodeError::UnknownTag(tag).into()),
        }
    }

    fn new_object(&mut self, depth: usize) -> Result<Value> {
        let desc = self.required_class_desc(depth + 1)?;
        let index = self.reserve();

        let mut class_data = Vec::new();
        for class in desc.hierarchy() {
            let mut data = ClassData {
                class_name: class.name.clone(),
                fields: Vec::with_capacity(class.fields.len()),
                annotation: Vec::new(),
            };

            if class.has(SC_SERIALIZABLE) {
                for field in &class.fields {
                    let value = self.field_value(field.type_code, depth + 1)?;
                    data.fields.push((field.name.clone(), value));
                }
                if class.has(SC_WRITE_METHOD) {
                    data.annotation = self.annotation(depth + 1)?;
                }
            } else if class.has(SC_EXTERNALIZABLE) {
                if !class.has(SC_BLOCK_DATA) {
                    return Err(DecodeError::Unsupported(format!(
                        "externalizable class {} written without block data",
                        class.name
                    ))
                    .into());
                }
                data.annotation = self.annotation(depth + 1)?;
            }

            class_data.push(data);
        }

        let value = Value::Object(Rc::new(Object {
            class: desc,
            class_data,
        }));
        self.assign(index, Slot::Value(value.clone()));
        Ok(value)
    }

    fn new_array(&mut self, depth: usize) -> Result<Value> {
        let desc = self.required_class_desc(depth + 1)?;
        let index = self.reserve();

        let size = self.i32()?;
        if size < 0 {
            return Err(DecodeError::NegativeLength(size as i64).into());
        }
        let element_code = match desc.name.strip_prefix('[').and_then(|rest| rest.chars().next()) {
            Some(code) => code,
            None => {
                return Err(DecodeError::Unsupported(format!("array of class {}", desc.name)).into());
            }
        };

        let mut elements = Vec::with_capacity((size as usize).min(1024));
        for _ in 0..size {
            elements.push(self.field_value(element_code, depth + 1)?);
        }

        let value = Value::Array(Rc::new(Array {
            class: desc,
            elements,
        }));
        self.assign(index, Slot::Value(value.clone()));
        Ok(value)
    }

    fn new_enum(&mut self, depth: usize) -> Result<Value> {
        let desc = self.required_class_desc(depth + 1)?;
        let index = self.reserve();

        let tag = self.u8()?;
        let name = match self.content(tag, depth + 1)? {
            Value::String(name) => name,
            other => {
                return Err(DecodeError::UnexpectedClass {
                    expected: "enum constant name",
                    found: other.kind().to_string(),
                }
                .into());
            }
        };

        let value = Value::Enum(Rc::new(EnumConstant { class: desc, name }));
        self.assign(index, Slot::Value(value.clone()));
        Ok(value)
    }

    fn field_value(&mut self, type_code: char, depth: usize) -> Result<Value> {
        Ok(match type_code {
            'B' => Value::Byte(self.u8()? as i8),
            'C' => Value::Char(self.u16()?),
            'D' => Value::Double(self.f64()?),
            'F' => Value::Float(self.f32()?),
            'I' => Value::Int(self.i32()?),
            'J' => Value::Long(self.i64()?),
            'S' => Value::Short(self.i16()?),
            'Z' => Value::Boolean(self.u8()? != 0),
            'L' | '[' => {
                let tag = self.u8()?;
                self.content(tag, depth)?
            }
            other => return Err(DecodeError::InvalidTypeCode(other).into()),
        })
    }

    /// Reads block data and objects up to `TC_ENDBLOCKDATA`.
    fn annotation(&mut self, depth: usize) -> Result<Vec<Annotation>> {
        let mut items = Vec::new();
        loop {
            let tag = self.u8()?;
            match tag {
                TC_ENDBLOCKDATA => return Ok(items),
                TC_BLOCKDATA => {
                    let len = self.u8()? as u64;
                    items.push(Annotation::Block(self.bytes(len)?));
                }
                TC_BLOCKDATALONG => {
                    let len = self.i32()?;
                    if len < 0 {
                        return Err(DecodeError::NegativeLength(len as i64).into());
                    }
                    items.push(Annotation::Block(self.bytes(len as u64)?));
                }
                _ => items.push(Annotation::Content(self.content(tag, depth)?)),
            }
        }
    }
}

/// Decodes Java's modified UTF-8 (`DataInput.readUTF`).
///
/// NUL is encoded as `C0 80` and supplementary characters as two 3-byte
/// surrogates, so the bytes are decoded to UTF-16 units first.
pub fn decode_modified_utf8(bytes: &[u8]) -> std::result::Result<String, DecodeError> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let a = bytes[i] as u16;
        if a & 0x80 == 0 {
            units.push(a);
            i += 1;
        } else if a & 0xE0 == 0xC0 {
            let b = continuation(bytes, i + 1)?;
            units.push(((a & 0x1F) << 6) | b);
            i += 2;
        } else if a & 0xF0 == 0xE0 {
            let b = continuation(bytes, i + 1)?;
            let c = continuation(bytes, i + 2)?;
            units.push(((a & 0x0F) << 12) | (b << 6) | c);
            i += 3;
        } else {
            return Err(DecodeError::MalformedString);
        }
    }
    Ok(String::from_utf16_lossy(&units))
}

fn continuation(bytes: &[u8], index: usize) -> std::result::Result<u16, DecodeError> {
    match bytes.get(index) {
        Some(&b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
        _ => Err(DecodeError::MalformedString),
    }
}
