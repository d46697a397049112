//! Wire format of the person sensor's result packet.
//!
//! Every read from the sensor returns a fixed 40 byte packet, little-endian
//! where fields span more than one byte:
//!
//! ```text
//! bytes  0..2   reserved
//! bytes  2..4   data_size (u16)
//! byte   4      num_faces (i8, 0..=4)
//! bytes  5..37  4 face records, 8 bytes each
//! byte   37     reserved
//! bytes 38..40  checksum (u16), CRC-16 over bytes 0..38
//! ```
//!
//! A face record is `[confidence][left][top][w0][h0][id_confidence][id][is_facing]`
//! where `w0`/`h0` depend on the [`GeometryLayout`].

use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Default 7-bit I2C address of the sensor board.
pub const I2C_ADDRESS: u8 = 0x62;
/// Length of one result packet.
pub const PACKET_LEN: usize = 40;
/// The sensor never reports more than this many faces.
pub const MAX_FACES: usize = 4;
/// Length of one face slot on the wire.
pub const FACE_RECORD_LEN: usize = 8;
/// Reserved bytes plus `data_size`.
pub const HEADER_LEN: usize = 4;

const NUM_FACES_OFFSET: usize = HEADER_LEN;
const FACES_OFFSET: usize = NUM_FACES_OFFSET + 1;
const CHECKSUM_OFFSET: usize = PACKET_LEN - 2;
const CRC_ALGO: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_IBM_3740);
/// Value of `data_size` written by [`Frame::to_bytes`]: the packet minus header and checksum.
const DATA_SIZE: u16 = (PACKET_LEN - HEADER_LEN - 2) as u16;

/// Errors produced while decoding a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("face count {0} outside 0..=4")]
    FaceCountOutOfRange(i8),
}

/// How the two geometry bytes after `left`/`top` are interpreted.
///
/// Firmware revisions disagree here, so the choice is explicit rather than
/// guessed from the data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeometryLayout {
    /// `[width][height]`, the layout of current firmware.
    #[default]
    WidthHeight,
    /// `[right][bottom]`, used by older firmware.
    Corners,
}

/// Face bounding box in sensor viewport units, where 255 spans the full view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u8,
    pub top: u8,
    pub width: u8,
    pub height: u8,
}

impl BoundingBox {
    pub fn right(&self) -> u8 {
        self.left.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u8 {
        self.top.saturating_add(self.height)
    }

    fn read(bytes: &[u8], layout: GeometryLayout) -> Self {
        let (left, top) = (bytes[0], bytes[1]);
        match layout {
            GeometryLayout::WidthHeight => Self {
                left,
                top,
                width: bytes[2],
                height: bytes[3],
            },
            GeometryLayout::Corners => Self {
                left,
                top,
                width: bytes[2].saturating_sub(left),
                height: bytes[3].saturating_sub(top),
            },
        }
    }

    fn write(&self, out: &mut [u8], layout: GeometryLayout) {
        out[0] = self.left;
        out[1] = self.top;
        let (a, b) = match layout {
            GeometryLayout::WidthHeight => (self.width, self.height),
            GeometryLayout::Corners => (self.right(), self.bottom()),
        };
        out[2] = a;
        out[3] = b;
    }
}

/// A single detected face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRecord {
    /// Detection certainty, 0 to 255.
    pub box_confidence: u8,
    #[serde(flatten)]
    pub bounds: BoundingBox,
    /// Recognition certainty. Zero means the face was not recognized.
    pub id_confidence: u8,
    /// Identity label assigned by the sensor.
    pub id: i8,
    pub is_facing: bool,
}

impl FaceRecord {
    pub fn is_recognized(&self) -> bool {
        self.id_confidence > 0
    }

    fn read(bytes: &[u8], layout: GeometryLayout) -> Self {
        Self {
            box_confidence: bytes[0],
            bounds: BoundingBox::read(&bytes[1..5], layout),
            id_confidence: bytes[5],
            id: bytes[6] as i8,
            is_facing: bytes[7] == 1,
        }
    }

    fn write(&self, out: &mut [u8], layout: GeometryLayout) {
        out[0] = self.box_confidence;
        self.bounds.write(&mut out[1..5], layout);
        out[5] = self.id_confidence;
        out[6] = self.id as u8;
        out[7] = u8::from(self.is_facing);
    }
}

/// One decoded sensor result.
///
/// Only the first `num_faces` slots are reachable; the remaining slots hold
/// whatever the sensor left there and are never exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data_size: u16,
    num_faces: u8,
    slots: [FaceRecord; MAX_FACES],
    checksum: u16,
}

impl Frame {
    /// Build a frame from up to [`MAX_FACES`] faces.
    pub fn new(faces: &[FaceRecord]) -> Result<Self, DecodeError> {
        if faces.len() > MAX_FACES {
            return Err(DecodeError::FaceCountOutOfRange(
                i8::try_from(faces.len()).unwrap_or(i8::MAX),
            ));
        }
        let mut slots = [FaceRecord::default(); MAX_FACES];
        slots[..faces.len()].copy_from_slice(faces);
        Ok(Self {
            data_size: DATA_SIZE,
            num_faces: faces.len() as u8,
            slots,
            checksum: 0,
        })
    }

    /// A frame with no faces in view.
    pub fn empty() -> Self {
        Self {
            data_size: DATA_SIZE,
            num_faces: 0,
            slots: [FaceRecord::default(); MAX_FACES],
            checksum: 0,
        }
    }

    pub fn faces(&self) -> &[FaceRecord] {
        &self.slots[..self.num_faces as usize]
    }

    pub fn num_faces(&self) -> usize {
        self.num_faces as usize
    }

    /// Informational size from the header. Not checked against the buffer.
    pub fn data_size(&self) -> u16 {
        self.data_size
    }

    /// Checksum as transmitted. Frames built with [`Frame::new`] carry 0.
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    /// Encode the frame into a wire packet with a freshly computed checksum.
    pub fn to_bytes(&self, layout: GeometryLayout) -> [u8; PACKET_LEN] {
        let mut out = [0u8; PACKET_LEN];
        out[2..4].copy_from_slice(&self.data_size.to_le_bytes());
        out[NUM_FACES_OFFSET] = self.num_faces;
        for (i, face) in self.faces().iter().enumerate() {
            let start = FACES_OFFSET + i * FACE_RECORD_LEN;
            face.write(&mut out[start..start + FACE_RECORD_LEN], layout);
        }
        let crc = checksum(&out[..CHECKSUM_OFFSET]);
        out[CHECKSUM_OFFSET..].copy_from_slice(&crc.to_le_bytes());
        out
    }
}

impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Frame", 3)?;
        s.serialize_field("data_size", &self.data_size)?;
        s.serialize_field("faces", self.faces())?;
        s.serialize_field("checksum", &self.checksum)?;
        s.end()
    }
}

/// Decode a packet using the default [`GeometryLayout`].
pub fn decode(raw: &[u8; PACKET_LEN]) -> Result<Frame, DecodeError> {
    decode_with(raw, GeometryLayout::default())
}

/// Decode a packet, reading face geometry with `layout`.
///
/// The checksum is carried through but never verified here; see
/// [`verify_checksum`].
pub fn decode_with(raw: &[u8; PACKET_LEN], layout: GeometryLayout) -> Result<Frame, DecodeError> {
    let data_size = u16::from_le_bytes([raw[2], raw[3]]);
    let count = raw[NUM_FACES_OFFSET] as i8;
    if !(0..=MAX_FACES as i8).contains(&count) {
        return Err(DecodeError::FaceCountOutOfRange(count));
    }
    let mut slots = [FaceRecord::default(); MAX_FACES];
    for (i, slot) in slots.iter_mut().enumerate() {
        let start = FACES_OFFSET + i * FACE_RECORD_LEN;
        *slot = FaceRecord::read(&raw[start..start + FACE_RECORD_LEN], layout);
    }
    let checksum = u16::from_le_bytes([raw[CHECKSUM_OFFSET], raw[CHECKSUM_OFFSET + 1]]);
    Ok(Frame {
        data_size,
        num_faces: count as u8,
        slots,
        checksum,
    })
}

/// CRC-16/CCITT-FALSE: polynomial 0x1021, initial value 0xFFFF, no reflection.
pub fn checksum(bytes: &[u8]) -> u16 {
    CRC_ALGO.checksum(bytes)
}

/// Whether the trailing checksum matches the CRC of the rest of the packet.
pub fn verify_checksum(raw: &[u8; PACKET_LEN]) -> bool {
    let stored = u16::from_le_bytes([raw[CHECKSUM_OFFSET], raw[CHECKSUM_OFFSET + 1]]);
    checksum(&raw[..CHECKSUM_OFFSET]) == stored
}

/// Accept a read result only when exactly [`PACKET_LEN`] bytes arrived.
///
/// Anything else means there is no frame this cycle.
pub fn packet_from_read(buf: &[u8], bytes_read: usize) -> Option<&[u8; PACKET_LEN]> {
    if bytes_read != PACKET_LEN {
        return None;
    }
    buf.get(..PACKET_LEN)?.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_check_value() {
        assert_eq!(checksum(b"123456789"), 0x29B1);
    }

    fn bitwise_ccitt_false(bytes: &[u8]) -> u16 {
        let mut crc: u16 = 0xFFFF;
        for &b in bytes {
            crc ^= (b as u16) << 8;
            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ 0x1021
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    #[test]
    fn crc_matches_polynomial_definition() {
        let face = FaceRecord {
            box_confidence: 180,
            id_confidence: 12,
            id: 3,
            is_facing: true,
            ..FaceRecord::default()
        };
        let encoded = Frame::new(&[face]).unwrap().to_bytes(GeometryLayout::WidthHeight);
        let inputs: [&[u8]; 3] = [b"123456789", &encoded[..CHECKSUM_OFFSET], &[0xFF; 38]];
        for input in inputs {
            assert_eq!(checksum(input), bitwise_ccitt_false(input));
        }
    }

    #[test]
    fn corners_layout_normalises_to_width_height() {
        let bytes = [10, 20, 110, 70];
        let b = BoundingBox::read(&bytes, GeometryLayout::Corners);
        assert_eq!((b.width, b.height), (100, 50));
        assert_eq!((b.right(), b.bottom()), (110, 70));
    }

    #[test]
    fn inverted_corners_saturate() {
        let b = BoundingBox::read(&[50, 50, 10, 10], GeometryLayout::Corners);
        assert_eq!((b.width, b.height), (0, 0));
    }

    #[test]
    fn is_facing_requires_exactly_one() {
        let f = FaceRecord::read(&[0, 0, 0, 0, 0, 0, 0, 2], GeometryLayout::WidthHeight);
        assert!(!f.is_facing);
    }
}
