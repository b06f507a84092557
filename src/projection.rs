//! Serialization-ready views of a `DecodedEntry`: a JSON tree, human
//! readable tables, and the CSV summary / bodyfile rows used by the CLI.

use crate::attribute::{
    Acl, Attribute, AttributeBody, AttributeForm, AttributeHeader, AttributeListEntry,
    AttributeType, FileName, FileNamespace, ObjectId, SecurityDescriptor, StandardInformation,
    VolumeInformation,
};
use crate::entry::{AttributeFailure, DecodedEntry};
use crate::header::{EntryHeader, FixupStatus};
use crate::time::FileTime;
use crate::types::FileReference;
use prettytable::{Table, row};
use serde_json::{Map, Value, json};
use std::fmt::{self, Display};

fn time_json(ft: &FileTime) -> Value {
    match ft {
        FileTime::Valid(_) => json!(ft.format()),
        FileTime::Invalid(raw) => json!({ "invalid": true, "raw": raw }),
    }
}

fn reference_json(r: &FileReference) -> Value {
    json!({
        "segment_number": r.segment_number,
        "sequence_number": r.sequence_number,
    })
}

fn header_json(h: &EntryHeader) -> Value {
    json!({
        "magic": String::from_utf8_lossy(&h.magic),
        "signature": h.signature.as_str(),
        "usa_offset": h.usa_offset,
        "usa_count": h.usa_count,
        "sequence_number": h.sequence_number,
        "log_file_sequence_number": h.log_file_sequence_number,
        "first_attribute_offset": h.first_attribute_offset,
        "flags": {
            "active": h.is_active(),
            "has_index": h.has_index(),
            "raw": h.flags.bits(),
        },
        "used_size": h.used_size,
        "total_size": h.total_size,
        "base_record": reference_json(&h.base_record),
        "first_attribute_id": h.first_attribute_id,
        "reference_count": h.reference_count,
        "record_number": h.record_number,
    })
}

fn fixups_str(status: &FixupStatus) -> String {
    match status {
        FixupStatus::Applied => "applied".into(),
        FixupStatus::NotPresent => "not_present".into(),
        FixupStatus::OutOfBounds => "out_of_bounds".into(),
        FixupStatus::Mismatch { sector } => format!("mismatch_sector_{}", sector),
    }
}

fn attribute_header_json(h: &AttributeHeader) -> Value {
    let form = match &h.form {
        AttributeForm::Resident {
            value_length,
            value_offset,
            resident_flags,
        } => json!({
            "resident": true,
            "value_length": value_length,
            "value_offset": value_offset,
            "resident_flags": resident_flags,
        }),
        AttributeForm::NonResident {
            lowest_vcn,
            highest_vcn,
            allocated_size,
            real_size,
            initialized_size,
            ..
        } => json!({
            "resident": false,
            "lowest_vcn": lowest_vcn,
            "highest_vcn": highest_vcn,
            "allocated_size": allocated_size,
            "real_size": real_size,
            "initialized_size": initialized_size,
        }),
    };
    json!({
        "type_code": h.type_code.code(),
        "record_length": h.record_length,
        "form": form,
        "name": h.name,
        "flags": h.flags,
        "attribute_id": h.attribute_id,
    })
}

fn standard_information_json(si: &StandardInformation) -> Value {
    json!({
        "created": time_json(&si.created),
        "modified": time_json(&si.modified),
        "mft_modified": time_json(&si.mft_modified),
        "accessed": time_json(&si.accessed),
        "file_attributes": si.file_attributes.bits(),
        "max_versions": si.max_versions,
        "version_number": si.version_number,
        "class_id": si.class_id,
        "owner_id": si.owner_id,
        "security_id": si.security_id,
        "quota_charged": si.quota_charged,
        "usn": si.usn,
    })
}

fn namespace_str(ns: &FileNamespace) -> String {
    match ns {
        FileNamespace::Posix => "POSIX".into(),
        FileNamespace::Win32 => "WIN32".into(),
        FileNamespace::Dos => "DOS".into(),
        FileNamespace::Win32AndDos => "WIN32_DOS".into(),
        FileNamespace::Unknown(raw) => format!("UNKNOWN({})", raw),
    }
}

fn file_name_json(f: &FileName) -> Value {
    json!({
        "parent": reference_json(&f.parent),
        "created": time_json(&f.created),
        "modified": time_json(&f.modified),
        "mft_modified": time_json(&f.mft_modified),
        "accessed": time_json(&f.accessed),
        "allocated_size": f.allocated_size,
        "real_size": f.real_size,
        "flags": f.flags.bits(),
        "reparse_value": f.reparse_value,
        "namespace": namespace_str(&f.namespace),
        "name": f.name,
    })
}

fn attribute_list_json(entries: &[AttributeListEntry]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|e| {
                json!({
                    "type_code": e.type_code.code(),
                    "name": e.name,
                    "starting_vcn": e.starting_vcn,
                    "base_record": reference_json(&e.base_record),
                    "attribute_id": e.attribute_id,
                })
            })
            .collect(),
    )
}

fn object_id_json(o: &ObjectId) -> Value {
    json!({
        "object_id": o.object_id.map(|g| g.to_string()),
        "birth_volume_id": o.birth_volume_id.map(|g| g.to_string()),
        "birth_object_id": o.birth_object_id.map(|g| g.to_string()),
        "domain_id": o.domain_id.map(|g| g.to_string()),
    })
}

fn acl_json(acl: &Option<Acl>) -> Value {
    match acl {
        Some(acl) => json!({
            "revision": acl.revision,
            "size": acl.size,
            "ace_count": acl.ace_count,
            "entries": acl.entries.iter().map(|ace| json!({
                "type": ace.ace_type,
                "flags": ace.flags,
                "size": ace.size,
            })).collect::<Vec<_>>(),
        }),
        None => Value::Null,
    }
}

fn security_descriptor_json(sd: &SecurityDescriptor) -> Value {
    json!({
        "revision": sd.revision,
        "control": sd.control.bits(),
        "owner_sid": sd.owner_sid.as_ref().map(|s| s.to_string()),
        "group_sid": sd.group_sid.as_ref().map(|s| s.to_string()),
        "sacl": acl_json(&sd.sacl),
        "dacl": acl_json(&sd.dacl),
    })
}

fn volume_information_json(v: &VolumeInformation) -> Value {
    json!({
        "major_version": v.major_version,
        "minor_version": v.minor_version,
        "flags": v.flags.bits(),
    })
}

fn body_json(body: &AttributeBody) -> Value {
    match body {
        AttributeBody::StandardInformation(si) => standard_information_json(si),
        AttributeBody::AttributeList(entries) => attribute_list_json(entries),
        AttributeBody::FileName(f) => file_name_json(f),
        AttributeBody::ObjectId(o) => object_id_json(o),
        AttributeBody::SecurityDescriptor(sd) => security_descriptor_json(sd),
        AttributeBody::VolumeName(name) => json!(name),
        AttributeBody::VolumeInformation(v) => volume_information_json(v),
        AttributeBody::Absent => Value::Null,
    }
}

fn attribute_json(a: &Attribute) -> Value {
    json!({
        "offset": a.offset,
        "header": attribute_header_json(&a.header),
        "body": body_json(&a.body),
    })
}

fn failure_json(f: &AttributeFailure) -> Value {
    json!({
        "offset": f.offset,
        "type": f.type_code.key(),
        "attribute_id": f.attribute_id,
        "reason": f.reason,
    })
}

impl DecodedEntry {
    /// Nested JSON tree. All ten known attribute keys are always present,
    /// `null` when the entry has none of that type. `record_index` is the
    /// entry's position in the input, independent of the header.
    pub fn to_json(&self, record_index: u64) -> Value {
        let mut attributes = Map::new();
        for t in AttributeType::KNOWN {
            attributes.insert(t.key(), Value::Null);
        }
        for (t, list) in &self.attributes {
            attributes.insert(
                t.key(),
                Value::Array(list.iter().map(attribute_json).collect()),
            );
        }
        json!({
            "record_index": record_index,
            "md5": self.md5,
            "header": header_json(&self.header),
            "fixups": fixups_str(&self.fixups),
            "attributes": Value::Object(attributes),
            "failures": self.failures.iter().map(failure_json).collect::<Vec<_>>(),
        })
    }
}

fn time_cell(ft: &FileTime) -> String {
    match ft {
        FileTime::Valid(_) => ft.format().unwrap_or_default(),
        FileTime::Invalid(raw) => format!("Invalid (0x{:016X})", raw),
    }
}

impl Display for DecodedEntry {
    /// Human-readable tables.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let h = &self.header;
        let mut hdr = Table::new();
        hdr.add_row(row!["MFT Entry Header Values"]);
        hdr.add_row(row![b -> "Record Number", h.record_number]);
        hdr.add_row(row![b -> "Signature", h.signature.as_str()]);
        hdr.add_row(row![b -> "Sequence", h.sequence_number]);
        hdr.add_row(row![b -> "$LogFile Sequence Number", h.log_file_sequence_number]);
        hdr.add_row(row![b -> "Flags", format!("{:?}", h.flags)]);
        hdr.add_row(row![b -> "Links", h.reference_count]);
        hdr.add_row(row![b -> "Used / Total", format!("{} / {}", h.used_size, h.total_size)]);
        hdr.add_row(row![b -> "Base Record", h.base_record]);
        hdr.add_row(row![b -> "Fixups", fixups_str(&self.fixups)]);
        hdr.add_row(row![b -> "MD5", self.md5]);
        writeln!(f, "{}", hdr)?;

        let mut attrs = Table::new();
        attrs.add_row(row!["Attributes", "Name", "Status", "Size"]);
        for a in self.attributes_in_order() {
            let label = format!(
                "{} (0x{:X}-#{})",
                a.header.type_code,
                a.header.type_code.code(),
                a.header.attribute_id
            );
            let name = a.header.name.clone().unwrap_or_else(|| "N/A".to_string());
            let status = if a.header.is_resident() {
                "Resident"
            } else {
                "Non-resident"
            };
            attrs.add_row(row![label, name, status, a.header.value_size()]);
        }
        for fail in &self.failures {
            let label = format!(
                "{} (0x{:X}-#{})",
                fail.type_code,
                fail.type_code.code(),
                fail.attribute_id
            );
            attrs.add_row(row![label, "", "Decode failed", fail.reason]);
        }
        writeln!(f, "{}", attrs)?;

        if let Some(si) = self.standard_information() {
            let mut t = Table::new();
            t.add_row(row!["$STANDARD_INFORMATION"]);
            t.add_row(row![b -> "Created", time_cell(&si.created)]);
            t.add_row(row![b -> "File Modified", time_cell(&si.modified)]);
            t.add_row(row![b -> "MFT Modified", time_cell(&si.mft_modified)]);
            t.add_row(row![b -> "Accessed", time_cell(&si.accessed)]);
            t.add_row(row![b -> "Flags", si.file_attributes.describe()]);
            t.add_row(row![b -> "Owner ID", si.owner_id.map_or("-".into(), |v| v.to_string())]);
            t.add_row(row![b -> "Security ID", si.security_id.map_or("-".into(), |v| v.to_string())]);
            if let Some(u) = si.usn {
                t.add_row(row![b -> "Last USN", u]);
            }
            writeln!(f, "{}", t)?;
        }

        let names = self.file_names();
        if !names.is_empty() {
            let mut t = Table::new();
            t.add_row(row!["$FILE_NAME Attributes"]);
            for fname in names {
                t.add_row(row![b -> "Name", fname.name.clone()]);
                t.add_row(row![b -> "Namespace", namespace_str(&fname.namespace)]);
                t.add_row(row![b -> "Parent MFT", fname.parent]);
                t.add_row(row![b -> "Allocated", fname.allocated_size]);
                t.add_row(row![b -> "Actual", fname.real_size]);
                t.add_row(row!["- Created", time_cell(&fname.created)]);
                t.add_row(row!["- Modified", time_cell(&fname.modified)]);
                t.add_row(row!["- MFT Mod", time_cell(&fname.mft_modified)]);
                t.add_row(row!["- Accessed", time_cell(&fname.accessed)]);
                t.add_row(row!["", ""]);
            }
            writeln!(f, "{}", t)?;
        }
        Ok(())
    }
}

fn time_field(ft: Option<&FileTime>) -> String {
    ft.and_then(|t| t.format()).unwrap_or_default()
}

/// One summary row: position in the input, header fields, first name,
/// SI and FN times (modified, accessed, created, entry modified) and
/// per-type counts.
pub fn csv_summary_row(entry: &DecodedEntry, record_index: u64, sep: &str) -> String {
    let h = &entry.header;
    let si = entry.standard_information();
    let fname = entry.file_names().into_iter().next();
    let mut cols = vec![
        record_index.to_string(),
        h.record_number.to_string(),
        h.signature.as_str().to_string(),
        h.sequence_number.to_string(),
        h.log_file_sequence_number.to_string(),
        h.base_record.segment_number.to_string(),
        h.base_record.sequence_number.to_string(),
        h.is_active().to_string(),
        h.has_index().to_string(),
        h.used_size.to_string(),
        h.total_size.to_string(),
        h.reference_count.to_string(),
        h.first_attribute_id.to_string(),
        fname.map(|f| f.name.clone()).unwrap_or_default(),
        time_field(si.map(|s| &s.modified)),
        time_field(si.map(|s| &s.accessed)),
        time_field(si.map(|s| &s.created)),
        time_field(si.map(|s| &s.mft_modified)),
        time_field(fname.map(|f| &f.modified)),
        time_field(fname.map(|f| &f.accessed)),
        time_field(fname.map(|f| &f.created)),
        time_field(fname.map(|f| &f.mft_modified)),
    ];
    cols.extend(AttributeType::KNOWN.iter().map(|t| entry.count(*t).to_string()));
    cols.join(sep)
}

pub const CSV_HEADER: [&str; 32] = [
    "RecordIndex",
    "RecordNumber",
    "Signature",
    "SequenceNumber",
    "LogFileSequenceNumber",
    "BaseFileRecordSegmentNumber",
    "BaseFileRecordSequenceNumber",
    "Active",
    "HasIndex",
    "UsedSize",
    "TotalSize",
    "ReferenceCount",
    "FirstAttributeId",
    "FileName",
    "StandardInformationModifyDate",
    "StandardInformationAccessDate",
    "StandardInformationCreateDate",
    "StandardInformationEntryDate",
    "FileNameModifyDate",
    "FileNameAccessDate",
    "FileNameCreateDate",
    "FileNameEntryDate",
    "StandardInformationCount",
    "AttributeListCount",
    "FileNameCount",
    "ObjectIDCount",
    "SecurityDescriptorCount",
    "VolumeNameCount",
    "VolumeInformationCount",
    "DataCount",
    "IndexRootCount",
    "IndexAllocationCount",
];

fn unix_field(ft: &FileTime) -> String {
    ft.unix_seconds().map(|s| format!("{:.6}", s)).unwrap_or_default()
}

/// Bodyfile (mactime) lines, one per $STANDARD_INFORMATION and $FILE_NAME:
/// `MD5|name|inode|mode|UID|GID|size|atime|mtime|ctime|crtime`.
///
/// The inode is the entry's position in the `$MFT`, so BAAD or zeroed
/// headers still map back to their slot.
pub fn body_lines(entry: &DecodedEntry, record_index: u64) -> Vec<String> {
    let fname = entry.file_names().into_iter().next();
    let name = fname.map(|f| f.name.clone()).unwrap_or_default();
    let size = fname.map(|f| f.real_size).unwrap_or(0);

    let line = |label: &str, a: &FileTime, m: &FileTime, c: &FileTime, cr: &FileTime| {
        format!(
            "{}|{}{}|{}|0|0|0|{}|{}|{}|{}|{}",
            entry.md5,
            name,
            label,
            record_index,
            size,
            unix_field(a),
            unix_field(m),
            unix_field(c),
            unix_field(cr)
        )
    };

    let mut out = Vec::new();
    for si in entry
        .attributes_of(AttributeType::StandardInformation)
        .iter()
        .filter_map(|a| match &a.body {
            AttributeBody::StandardInformation(si) => Some(si),
            _ => None,
        })
    {
        out.push(line("", &si.accessed, &si.modified, &si.mft_modified, &si.created));
    }
    for f in entry.file_names() {
        out.push(line(
            " ($FILE_NAME)",
            &f.accessed,
            &f.modified,
            &f.mft_modified,
            &f.created,
        ));
    }
    out
}
