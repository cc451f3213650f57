use pond_mem::{ByteBuffer, ByteOrder, Seek};
use std::io;

#[test]
fn test_copy_on_write_isolation() {
    let mut primary = ByteBuffer::from_slice(b"header");
    let snapshot = primary.clone();
    assert_eq!(primary.ref_count(), 2);

    primary.seek_write(Seek::Start(0));
    primary.write_bytes(b"HEAD");

    assert_eq!(primary.as_slice(), b"HEAD");
    assert_eq!(snapshot.as_slice(), b"header");
    assert_eq!(primary.ref_count(), 1);
    assert_eq!(snapshot.ref_count(), 1);
}

#[test]
fn test_framed_message_round_trip() {
    let payload = b"payload bytes";

    let mut frame = ByteBuffer::new();
    frame.set_byte_order(ByteOrder::BigEndian);
    frame.write_value(0xCAFEu16);
    frame.write_value(payload.len() as u32);
    frame.write_bytes(payload);

    assert_eq!(&frame.as_slice()[..2], &[0xCA, 0xFE]);

    let mut reader = frame.clone();
    assert_eq!(reader.read_value::<u16>(), Ok(0xCAFE));
    let len = reader.read_value::<u32>().expect("length") as usize;
    let mut body = vec![0u8; len];
    reader.read_bytes(&mut body).expect("body");

    assert_eq!(body, payload);
    assert!(!reader.can_read_more());
    // Reading never detaches
    assert_eq!(frame.ref_count(), 2);
}

#[test]
fn test_io_copy_between_buffers() {
    let mut source = ByteBuffer::from_slice(&[5u8; 20_000]);
    let mut sink = ByteBuffer::new();

    let copied = io::copy(&mut source, &mut sink).expect("io copy");

    assert_eq!(copied, 20_000);
    assert_eq!(sink, source);
    assert_eq!(sink.capacity(), 64 * 1024);
}

#[test]
fn test_hex_round_trip() {
    let buffer = ByteBuffer::from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    let hex = buffer.to_hex_string(false);

    assert_eq!(hex, "deadbeef");
    assert_eq!(ByteBuffer::from_hex_str(&hex).expect("hex"), buffer);
}

#[test]
fn test_compressed_record_round_trip() {
    let mut record = ByteBuffer::new();
    record.write_str("name").expect("key");
    record.write_buffer(&ByteBuffer::from_slice(&[0u8; 4096])).expect("value");

    let packed = record.compress().expect("compress");
    assert!(packed.is_compressed());
    assert!(packed.len() < record.len());

    let mut unpacked = packed.uncompress().expect("uncompress");
    assert_eq!(unpacked, record);
    assert_eq!(unpacked.read_string().as_deref(), Ok("name"));
    assert_eq!(unpacked.read_buffer().expect("value").len(), 4096);
}
