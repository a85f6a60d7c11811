//! Integration tests loading recorded wire vectors from `test_vectors/`.

use std::path::PathBuf;

use datalink_rs_protocol::frame;
use datalink_rs_protocol::{Command, PacketHeader, PacketId, Reply, Response, StreamId};

fn vectors_dir() -> Option<PathBuf> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("test_vectors");
    if dir.exists() {
        Some(dir)
    } else {
        eprintln!("Test vectors not found at {dir:?}, skipping");
        None
    }
}

fn load_json(name: &str) -> Option<serde_json::Value> {
    let dir = vectors_dir()?;
    let path = dir.join(format!("{name}.json"));
    let content = std::fs::read_to_string(&path).ok()?;
    Some(serde_json::from_str(&content).unwrap())
}

fn decode_hex(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

#[test]
fn test_frame_vectors() {
    let Some(vectors) = load_json("frames") else {
        return;
    };

    for v in vectors.as_array().unwrap() {
        let header = v["header"].as_str().unwrap();
        let payload = decode_hex(v["payload_hex"].as_str().unwrap());
        let expected = decode_hex(v["frame_hex"].as_str().unwrap());

        let bytes = frame::write(header, &payload).unwrap();
        assert_eq!(bytes, expected, "frame for {header:?}");

        let (parsed, consumed) = frame::parse(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(&bytes[consumed..], payload.as_slice());
    }
}

#[test]
fn test_command_vectors() {
    let Some(vectors) = load_json("commands") else {
        return;
    };

    for v in vectors.as_array().unwrap() {
        let header = v["header"].as_str().unwrap();

        let cmd =
            Command::parse(header).unwrap_or_else(|e| panic!("failed to parse {header:?}: {e}"));
        assert_eq!(cmd.header(), header, "header round trip");
        assert_eq!(cmd.name(), v["name"].as_str().unwrap(), "name of {header:?}");
        assert_eq!(
            cmd.payload_len() as u64,
            v["payload_len"].as_u64().unwrap(),
            "payload length of {header:?}"
        );
        assert_eq!(
            cmd.expects_reply(),
            v["expects_reply"].as_bool().unwrap(),
            "reply expectation of {header:?}"
        );
    }
}

#[test]
fn test_reply_vectors() {
    let Some(vectors) = load_json("replies") else {
        return;
    };

    for v in vectors["valid"].as_array().unwrap() {
        let header = v["header"].as_str().unwrap();
        let reply = Reply::parse(header).unwrap_or_else(|e| panic!("{header:?}: {e}"));
        assert_eq!(reply.status, v["status"].as_str().unwrap());
        assert_eq!(reply.value, v["value"].as_str().unwrap());
        assert_eq!(reply.size as u64, v["size"].as_u64().unwrap());
        assert_eq!(reply.is_error(), v["is_error"].as_bool().unwrap());
        assert_eq!(reply.to_header(), header);
    }

    for v in vectors["invalid"].as_array().unwrap() {
        let header = v.as_str().unwrap();
        assert!(Reply::parse(header).is_err(), "{header:?} should be rejected");
    }
}

#[test]
fn test_packet_vectors() {
    let Some(vectors) = load_json("packets") else {
        return;
    };

    for v in vectors["valid"].as_array().unwrap() {
        let line = v["header"].as_str().unwrap();
        let header = PacketHeader::parse(line).unwrap_or_else(|e| panic!("{line:?}: {e}"));
        assert_eq!(header.stream_id, v["stream_id"].as_str().unwrap());
        assert_eq!(header.id, PacketId::new(v["id"].as_i64().unwrap()));
        assert_eq!(header.time, v["time"].as_i64().unwrap());
        assert_eq!(header.data_start, v["data_start"].as_i64().unwrap());
        assert_eq!(header.data_end, v["data_end"].as_i64().unwrap());
        assert_eq!(header.data_size as u64, v["data_size"].as_u64().unwrap());
        assert_eq!(header.to_header(), line);

        assert_eq!(Response::parse(line).unwrap(), Response::Packet(header));
    }

    for v in vectors["invalid"].as_array().unwrap() {
        let line = v.as_str().unwrap();
        assert!(Response::parse(line).is_err(), "{line:?} should be rejected");
    }
}

#[test]
fn test_stream_id_vectors() {
    let Some(vectors) = load_json("stream_ids") else {
        return;
    };

    for v in vectors.as_array().unwrap() {
        let text = v["text"].as_str().unwrap();
        let id = StreamId::parse(text);
        assert_eq!(id.as_str(), text);
        assert_eq!(id.w(), v["w"].as_str().unwrap(), "W of {text:?}");
        assert_eq!(id.x(), v["x"].as_str().unwrap(), "X of {text:?}");
        assert_eq!(id.y(), v["y"].as_str().unwrap(), "Y of {text:?}");
        assert_eq!(id.z(), v["z"].as_str().unwrap(), "Z of {text:?}");
        assert_eq!(id.kind(), v["kind"].as_str().unwrap(), "type of {text:?}");
    }
}
