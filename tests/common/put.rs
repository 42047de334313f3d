use gadgetio::ByteOrder;

pub fn put_u32(buf: &mut Vec<u8>, v: u32, order: ByteOrder) {
    match order {
        ByteOrder::Little => buf.extend_from_slice(&v.to_le_bytes()),
        ByteOrder::Big => buf.extend_from_slice(&v.to_be_bytes()),
    }
}

pub fn put_i32(buf: &mut Vec<u8>, v: i32, order: ByteOrder) {
    put_u32(buf, v as u32, order);
}

pub fn put_u64(buf: &mut Vec<u8>, v: u64, order: ByteOrder) {
    match order {
        ByteOrder::Little => buf.extend_from_slice(&v.to_le_bytes()),
        ByteOrder::Big => buf.extend_from_slice(&v.to_be_bytes()),
    }
}

pub fn put_f32(buf: &mut Vec<u8>, v: f32, order: ByteOrder) {
    put_u32(buf, v.to_bits(), order);
}

pub fn put_f64(buf: &mut Vec<u8>, v: f64, order: ByteOrder) {
    put_u64(buf, v.to_bits(), order);
}
