//! Archive builders for unit tests

#![allow(clippy::unwrap_used)]

fn put_name(out: &mut Vec<u8>, name: &str, width: usize, pad: u8) {
    let mut field = vec![pad; width];
    field[..name.len()].copy_from_slice(name.as_bytes());
    out.extend_from_slice(&field);
}

fn put_u32(out: &mut Vec<u8>, value: usize) {
    out.extend_from_slice(&u32::try_from(value).unwrap().to_le_bytes());
}

/// GRP with entries stored in order.
pub fn grp_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = b"KenSilverman".to_vec();
    put_u32(&mut out, entries.len());
    for (name, data) in entries {
        put_name(&mut out, name, 12, b' ');
        put_u32(&mut out, data.len());
    }
    for (_, data) in entries {
        out.extend_from_slice(data);
    }
    out
}

/// MVL with entries stored in order.
pub fn mvl_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = b"DMVL".to_vec();
    put_u32(&mut out, entries.len());
    for (name, data) in entries {
        put_name(&mut out, name, 13, 0);
        put_u32(&mut out, data.len());
    }
    for (_, data) in entries {
        out.extend_from_slice(data);
    }
    out
}

/// SLB with data first and the TOC at the end. Names use `\` separators.
pub fn slb_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut offsets = Vec::new();
    for (_, bytes) in entries {
        offsets.push(12 + data.len());
        data.extend_from_slice(bytes);
    }

    let mut out = Vec::new();
    put_u32(&mut out, 0);
    put_u32(&mut out, entries.len());
    put_u32(&mut out, 12 + data.len());
    out.extend_from_slice(&data);
    for ((name, bytes), offset) in entries.iter().zip(offsets) {
        out.push(b'\\');
        put_name(&mut out, name, 63, 0);
        put_u32(&mut out, offset);
        put_u32(&mut out, bytes.len());
    }
    out
}

/// WAD with the given signature, lumps first and the directory at the end.
pub fn wad_archive(signature: &[u8; 4], lumps: &[(&str, &[u8])]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut offsets = Vec::new();
    for (_, bytes) in lumps {
        offsets.push(12 + data.len());
        data.extend_from_slice(bytes);
    }

    let mut out = signature.to_vec();
    put_u32(&mut out, lumps.len());
    put_u32(&mut out, 12 + data.len());
    out.extend_from_slice(&data);
    for ((name, bytes), offset) in lumps.iter().zip(offsets) {
        put_u32(&mut out, offset);
        put_u32(&mut out, bytes.len());
        put_name(&mut out, name, 8, 0);
    }
    out
}
