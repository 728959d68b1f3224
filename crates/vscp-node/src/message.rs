//! Level I event model and 29-bit wire identifier codec.

use crate::error::MessageError;

/// Maximum payload bytes carried by a Level I event.
pub const MAX_DATA_LEN: usize = 8;

/// Mask of the 9 significant class bits.
pub const CLASS_MASK: u16 = 0x01FF;

/// Highest legal message priority (lowest urgency).
pub const PRIORITY_LOWEST: u8 = 7;

/// Priority used for node-originated traffic.
pub const PRIORITY_NORMAL: u8 = 3;

/// Largest identifier representable in a CAN extended frame.
pub const WIRE_ID_MAX: u32 = 0x1FFF_FFFF;

const PRIORITY_SHIFT: u32 = 26;
const HARD_CODED_SHIFT: u32 = 25;
const CLASS_SHIFT: u32 = 16;
const TYPE_SHIFT: u32 = 8;

/// A Level I event as received from or written to the transport.
///
/// The payload is stored inline; `data()` exposes only the valid prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Event {
    class: u16,
    event_type: u8,
    origin: u8,
    hard_coded: bool,
    priority: u8,
    data: [u8; MAX_DATA_LEN],
    data_len: u8,
}

/// Event received from the transport.
pub type RxEvent = Event;
/// Event handed to the transport for sending.
pub type TxEvent = Event;

impl Event {
    /// Creates an event without payload at normal priority.
    ///
    /// Class values are truncated to their 9 significant bits.
    #[must_use]
    pub const fn new(class: u16, event_type: u8, origin: u8) -> Self {
        Self {
            class: class & CLASS_MASK,
            event_type,
            origin,
            hard_coded: false,
            priority: PRIORITY_NORMAL,
            data: [0; MAX_DATA_LEN],
            data_len: 0,
        }
    }

    /// Replaces the payload.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::PayloadTooLong`] when `data` exceeds eight bytes.
    pub fn with_data(mut self, data: &[u8]) -> Result<Self, MessageError> {
        if data.len() > MAX_DATA_LEN {
            return Err(MessageError::PayloadTooLong { len: data.len() });
        }
        self.data = [0; MAX_DATA_LEN];
        self.data[..data.len()].copy_from_slice(data);
        #[allow(clippy::cast_possible_truncation)]
        {
            self.data_len = data.len() as u8;
        }
        Ok(self)
    }

    /// Replaces the priority.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidPriority`] for values above 7.
    pub const fn with_priority(mut self, priority: u8) -> Result<Self, MessageError> {
        if priority > PRIORITY_LOWEST {
            return Err(MessageError::InvalidPriority { priority });
        }
        self.priority = priority;
        Ok(self)
    }

    /// Sets the hard-coded origin flag.
    #[must_use]
    pub const fn with_hard_coded(mut self, hard_coded: bool) -> Self {
        self.hard_coded = hard_coded;
        self
    }

    /// Event class (9 bits).
    #[must_use]
    pub const fn class(&self) -> u16 {
        self.class
    }

    /// Event type within the class.
    #[must_use]
    pub const fn event_type(&self) -> u8 {
        self.event_type
    }

    /// Nickname of the sending node.
    #[must_use]
    pub const fn origin(&self) -> u8 {
        self.origin
    }

    /// `true` when the sender has a hardware-fixed address.
    #[must_use]
    pub const fn hard_coded(&self) -> bool {
        self.hard_coded
    }

    /// Message priority, 0 (highest) to 7 (lowest).
    #[must_use]
    pub const fn priority(&self) -> u8 {
        self.priority
    }

    /// Valid payload bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data[..usize::from(self.data_len)]
    }

    /// Number of valid payload bytes.
    #[must_use]
    pub const fn data_len(&self) -> u8 {
        self.data_len
    }

    /// Payload byte at `index`, if present.
    #[must_use]
    pub fn data_byte(&self, index: usize) -> Option<u8> {
        self.data().get(index).copied()
    }

    /// Composes the 29-bit wire identifier.
    ///
    /// Layout, MSB first: `priority(3) | hard_coded(1) | class(9) | type(8) | origin(8)`.
    #[must_use]
    pub const fn wire_id(&self) -> u32 {
        ((self.priority as u32) << PRIORITY_SHIFT)
            | ((self.hard_coded as u32) << HARD_CODED_SHIFT)
            | ((self.class as u32) << CLASS_SHIFT)
            | ((self.event_type as u32) << TYPE_SHIFT)
            | self.origin as u32
    }

    /// Rebuilds an event from a wire identifier and payload.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::IdentifierOutOfRange`] for identifiers wider than
    /// 29 bits and [`MessageError::PayloadTooLong`] for payloads over 8 bytes.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_wire(id: u32, payload: &[u8]) -> Result<Self, MessageError> {
        if id > WIRE_ID_MAX {
            return Err(MessageError::IdentifierOutOfRange { id });
        }
        let event = Self {
            class: ((id >> CLASS_SHIFT) as u16) & CLASS_MASK,
            event_type: (id >> TYPE_SHIFT) as u8,
            origin: id as u8,
            hard_coded: (id >> HARD_CODED_SHIFT) & 1 == 1,
            priority: ((id >> PRIORITY_SHIFT) & 0x07) as u8,
            data: [0; MAX_DATA_LEN],
            data_len: 0,
        };
        event.with_data(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::{Event, MessageError, CLASS_MASK, WIRE_ID_MAX};

    #[test]
    fn wire_id_packs_fields_msb_first() {
        let event = Event::new(0x1AB, 0xCD, 0xEF)
            .with_priority(5)
            .expect("priority in range")
            .with_hard_coded(true);

        assert_eq!(event.wire_id(), (5 << 26) | (1 << 25) | (0x1AB << 16) | 0xCDEF);
    }

    #[test]
    fn from_wire_recovers_every_field() {
        let event = Event::from_wire(0x1F23_4567, &[1, 2, 3]).expect("valid frame");

        assert_eq!(event.priority(), 7);
        assert!(event.hard_coded());
        assert_eq!(event.class(), 0x123);
        assert_eq!(event.event_type(), 0x45);
        assert_eq!(event.origin(), 0x67);
        assert_eq!(event.data(), &[1, 2, 3]);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let result = Event::new(10, 6, 1).with_data(&[0; 9]);
        assert_eq!(result, Err(MessageError::PayloadTooLong { len: 9 }));
    }

    #[test]
    fn identifier_wider_than_29_bits_is_rejected() {
        assert_eq!(
            Event::from_wire(WIRE_ID_MAX + 1, &[]),
            Err(MessageError::IdentifierOutOfRange {
                id: WIRE_ID_MAX + 1
            })
        );
    }

    #[test]
    fn class_is_truncated_to_nine_bits() {
        let event = Event::new(0xFFFF, 0, 0);
        assert_eq!(event.class(), CLASS_MASK);
    }

    #[test]
    fn priority_above_seven_is_rejected() {
        assert_eq!(
            Event::new(0, 0, 0).with_priority(8),
            Err(MessageError::InvalidPriority { priority: 8 })
        );
    }

    #[test]
    fn replacing_payload_clears_stale_bytes() {
        let event = Event::new(20, 3, 1)
            .with_data(&[9, 9, 9, 9])
            .and_then(|e| e.with_data(&[1]))
            .expect("payload fits");
        assert_eq!(event.data(), &[1]);
        assert_eq!(event.data_byte(1), None);
    }
}
