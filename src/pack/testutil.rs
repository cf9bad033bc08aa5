//! Writes pack streams laid out the way `ObjectOutputStream` lays them out.

use std::collections::HashMap;

use super::serial::*;
use super::structures::{OsConstraint, PackFile};

const MAX_BLOCK_SIZE: usize = 1024;
const STRING_SIG: Option<&str> = Some("Ljava/lang/String;");

struct ClassSpec {
    name: &'static str,
    suid: i64,
    flags: u8,
    fields: &'static [(char, &'static str, Option<&'static str>)],
    super_class: Option<&'static ClassSpec>,
}

static ENUM: ClassSpec = ClassSpec {
    name: "java.lang.Enum",
    suid: 0,
    flags: SC_SERIALIZABLE | SC_ENUM,
    fields: &[],
    super_class: None,
};

static OVERRIDE_TYPE: ClassSpec = ClassSpec {
    name: "com.izforge.izpack.api.data.OverrideType",
    suid: 0,
    flags: SC_SERIALIZABLE | SC_ENUM,
    fields: &[],
    super_class: Some(&ENUM),
};

static BLOCKABLE: ClassSpec = ClassSpec {
    name: "com.izforge.izpack.api.data.Blockable",
    suid: 0,
    flags: SC_SERIALIZABLE | SC_ENUM,
    fields: &[],
    super_class: Some(&ENUM),
};

static ARRAY_LIST: ClassSpec = ClassSpec {
    name: "java.util.ArrayList",
    suid: 8683452581122892189,
    flags: SC_SERIALIZABLE | SC_WRITE_METHOD,
    fields: &[('I', "size", None)],
    super_class: None,
};

static HASH_MAP: ClassSpec = ClassSpec {
    name: "java.util.HashMap",
    suid: 362498820763181265,
    flags: SC_SERIALIZABLE | SC_WRITE_METHOD,
    fields: &[('F', "loadFactor", None), ('I', "threshold", None)],
    super_class: None,
};

static OS_MODEL: ClassSpec = ClassSpec {
    name: "com.izforge.izpack.api.data.binding.OsModel",
    suid: 4541813025410419497,
    flags: SC_SERIALIZABLE,
    fields: &[
        ('L', "arch", STRING_SIG),
        ('L', "family", STRING_SIG),
        ('L', "jre", STRING_SIG),
        ('L', "name", STRING_SIG),
        ('L', "version", STRING_SIG),
    ],
    super_class: None,
};

// Primitives first, then references, each sorted by name.
static PACK_FILE: ClassSpec = ClassSpec {
    name: "com.izforge.izpack.api.data.PackFile",
    suid: -834377078706854909,
    flags: SC_SERIALIZABLE,
    fields: &[
        ('Z', "isDirectory", None),
        ('J', "length", None),
        ('J', "mtime", None),
        ('J', "offsetInPreviousPack", None),
        ('Z', "pack200Jar", None),
        ('L', "additionals", Some("Ljava/util/Map;")),
        ('L', "blockable", Some("Lcom/izforge/izpack/api/data/Blockable;")),
        ('L', "condition", STRING_SIG),
        ('L', "osConstraints", Some("Ljava/util/List;")),
        ('L', "override", Some("Lcom/izforge/izpack/api/data/OverrideType;")),
        ('L', "overrideRenameTo", STRING_SIG),
        ('L', "previousPackId", STRING_SIG),
        ('L', "relativePath", STRING_SIG),
        ('L', "targetPath", STRING_SIG),
    ],
    super_class: None,
};

pub(crate) struct StreamBuilder {
    out: Vec<u8>,
    block: Vec<u8>,
    next_handle: u32,
    /// Class descriptors and field type strings already in the stream.
    shared: HashMap<&'static str, u32>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self {
            out: vec![0xAC, 0xED, 0x00, 0x05],
            block: Vec::new(),
            next_handle: BASE_WIRE_HANDLE,
            shared: HashMap::new(),
        }
    }

    pub fn write_int(&mut self, value: i32) {
        self.block.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.block.extend_from_slice(data);
    }

    pub fn write_string(&mut self, s: &str) {
        self.drain();
        self.string(s);
    }

    pub fn write_pack_file(&mut self, record: &PackFile) {
        self.drain();
        self.pack_file(record);
    }

    pub fn reset(&mut self) {
        self.drain();
        self.out.push(TC_RESET);
        self.next_handle = BASE_WIRE_HANDLE;
        self.shared.clear();
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.drain();
        self.out
    }

    fn drain(&mut self) {
        for chunk in self.block.chunks(MAX_BLOCK_SIZE) {
            if chunk.len() <= 0xFF {
                self.out.push(TC_BLOCKDATA);
                self.out.push(chunk.len() as u8);
            } else {
                self.out.push(TC_BLOCKDATALONG);
                self.out.extend_from_slice(&(chunk.len() as i32).to_be_bytes());
            }
            self.out.extend_from_slice(chunk);
        }
        self.block.clear();
    }

    fn handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn utf(&mut self, s: &str) {
        self.out.extend_from_slice(&(s.len() as u16).to_be_bytes());
        self.out.extend_from_slice(s.as_bytes());
    }

    fn reference(&mut self, handle: u32) {
        self.out.push(TC_REFERENCE);
        self.out.extend_from_slice(&handle.to_be_bytes());
    }

    fn string(&mut self, s: &str) {
        self.out.push(TC_STRING);
        self.handle();
        self.utf(s);
    }

    fn opt_string(&mut self, s: Option<&str>) {
        match s {
            Some(s) => self.string(s),
            None => self.out.push(TC_NULL),
        }
    }

    fn type_string(&mut self, signature: &'static str) {
        if let Some(&handle) = self.shared.get(signature) {
            return self.reference(handle);
        }
        let handle = self.next_handle;
        self.string(signature);
        self.shared.insert(signature, handle);
    }

    fn class_desc(&mut self, spec: &'static ClassSpec) {
        if let Some(&handle) = self.shared.get(spec.name) {
            return self.reference(handle);
        }
        self.out.push(TC_CLASSDESC);
        self.utf(spec.name);
        self.out.extend_from_slice(&spec.suid.to_be_bytes());
        let handle = self.handle();
        self.shared.insert(spec.name, handle);
        self.out.push(spec.flags);
        self.out
            .extend_from_slice(&(spec.fields.len() as u16).to_be_bytes());
        for &(code, name, signature) in spec.fields {
            self.out.push(code as u8);
            self.utf(name);
            if let Some(signature) = signature {
                self.type_string(signature);
            }
        }
        self.out.push(TC_ENDBLOCKDATA);
        match spec.super_class {
            Some(super_class) => self.class_desc(super_class),
            None => self.out.push(TC_NULL),
        }
    }

    fn enum_constant(&mut self, spec: &'static ClassSpec, name: &str) {
        self.out.push(TC_ENUM);
        self.class_desc(spec);
        self.handle();
        self.string(name);
    }

    fn pack_file(&mut self, record: &PackFile) {
        self.out.push(TC_OBJECT);
        self.class_desc(&PACK_FILE);
        self.handle();

        self.out.push(record.is_directory as u8);
        self.out
            .extend_from_slice(&(record.length as i64).to_be_bytes());
        self.out.extend_from_slice(&record.mtime.to_be_bytes());
        self.out
            .extend_from_slice(&record.offset_in_previous_pack.to_be_bytes());
        self.out.push(record.pack200_jar as u8);

        if record.additionals > 0 {
            self.hash_map(record.additionals);
        } else {
            self.out.push(TC_NULL);
        }
        match &record.blockable {
            Some(blockable) => self.enum_constant(&BLOCKABLE, blockable.as_str()),
            None => self.out.push(TC_NULL),
        }
        self.opt_string(record.condition.as_deref());
        if record.os_constraints.is_empty() {
            self.out.push(TC_NULL);
        } else {
            self.array_list(&record.os_constraints);
        }
        match &record.override_type {
            Some(override_type) => self.enum_constant(&OVERRIDE_TYPE, override_type.as_str()),
            None => self.out.push(TC_NULL),
        }
        self.opt_string(record.override_rename_to.as_deref());
        self.opt_string(record.previous_pack_id.as_deref());
        self.opt_string(record.relative_path.as_deref());
        self.string(&record.target_path);
    }

    fn array_list(&mut self, items: &[OsConstraint]) {
        self.out.push(TC_OBJECT);
        self.class_desc(&ARRAY_LIST);
        self.handle();
        self.out
            .extend_from_slice(&(items.len() as i32).to_be_bytes());

        self.write_int(items.len() as i32);
        self.drain();
        for item in items {
            self.out.push(TC_OBJECT);
            self.class_desc(&OS_MODEL);
            self.handle();
            self.opt_string(item.arch.as_deref());
            self.opt_string(item.family.as_deref());
            self.opt_string(item.jre.as_deref());
            self.opt_string(item.name.as_deref());
            self.opt_string(item.version.as_deref());
        }
        self.out.push(TC_ENDBLOCKDATA);
    }

    fn hash_map(&mut self, entries: usize) {
        self.out.push(TC_OBJECT);
        self.class_desc(&HASH_MAP);
        self.handle();
        self.out.extend_from_slice(&0.75f32.to_be_bytes());
        self.out.extend_from_slice(&12i32.to_be_bytes());

        self.write_int(16);
        self.write_int(entries as i32);
        self.drain();
        for i in 0..entries {
            self.string(&format!("key{i}"));
            self.string(&format!("value{i}"));
        }
        self.out.push(TC_ENDBLOCKDATA);
    }
}

pub(crate) fn file(target_path: &str, length: u64) -> PackFile {
    PackFile {
        relative_path: None,
        target_path: target_path.to_string(),
        os_constraints: Vec::new(),
        length,
        mtime: -1,
        is_directory: false,
        override_type: None,
        override_rename_to: None,
        blockable: None,
        additionals: 0,
        previous_pack_id: None,
        offset_in_previous_pack: -1,
        pack200_jar: false,
        condition: None,
    }
}

pub(crate) fn directory(target_path: &str) -> PackFile {
    PackFile {
        is_directory: true,
        ..file(target_path, 0)
    }
}

/// A complete pack: record count, then each header followed by its payload.
pub(crate) fn archive(entries: &[(PackFile, &[u8])]) -> Vec<u8> {
    let mut builder = StreamBuilder::new();
    builder.write_int(entries.len() as i32);
    for (record, payload) in entries {
        builder.write_pack_file(record);
        builder.write_bytes(payload);
    }
    builder.finish()
}
