//! Roles and the privileges they grant.
//!
//! A [`PrivilegeSet`] maps each granted [`Privilege`] to an absolute expiry
//! (unix seconds). It serializes in insertion order:
//!
//! ```text
//! u16 count | (u16 code | u32 expires_at) * count
//! ```

use crate::codec::{Packer, length_prefix};
use crate::error::TokenError;

/// An action a token holder may perform in a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Privilege {
    JoinChannel = 1,
    PublishAudio = 2,
    PublishVideo = 3,
    PublishData = 4,
}

impl Privilege {
    /// Wire code of this privilege.
    pub const fn code(self) -> u16 {
        self as u16
    }

    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::JoinChannel),
            2 => Some(Self::PublishAudio),
            3 => Some(Self::PublishVideo),
            4 => Some(Self::PublishData),
            _ => None,
        }
    }
}

/// Role requested for a channel participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Join only.
    Subscriber = 0,
    /// Join and publish audio, video and data.
    #[default]
    Publisher = 1,
}

impl Role {
    /// Privileges granted to this role, in wire order.
    pub const fn privileges(self) -> &'static [Privilege] {
        match self {
            Self::Subscriber => &[Privilege::JoinChannel],
            Self::Publisher => &[
                Privilege::JoinChannel,
                Privilege::PublishAudio,
                Privilege::PublishVideo,
                Privilege::PublishData,
            ],
        }
    }
}

impl TryFrom<i64> for Role {
    type Error = TokenError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Subscriber),
            1 => Ok(Self::Publisher),
            other => Err(TokenError::InvalidRole(other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subscriber => write!(f, "subscriber"),
            Self::Publisher => write!(f, "publisher"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "subscriber" | "0" => Ok(Self::Subscriber),
            "publisher" | "1" => Ok(Self::Publisher),
            _ => Err(TokenError::InvalidRole(s.parse().unwrap_or(-1))),
        }
    }
}

/// Ordered privilege → expiry map with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivilegeSet {
    entries: Vec<(Privilege, u32)>,
}

impl PrivilegeSet {
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Every privilege of `role`, all expiring at `expires_at`.
    pub fn for_role(role: Role, expires_at: u32) -> Self {
        let mut set = Self::new();
        for &privilege in role.privileges() {
            set.insert(privilege, expires_at);
        }
        set
    }

    /// Grant `privilege` until `expires_at`. An existing entry keeps its
    /// position and takes the new expiry.
    pub fn insert(&mut self, privilege: Privilege, expires_at: u32) {
        if let Some(entry) = self.entries.iter_mut().find(|(p, _)| *p == privilege) {
            entry.1 = expires_at;
        } else {
            self.entries.push((privilege, expires_at));
        }
    }

    pub fn get(&self, privilege: Privilege) -> Option<u32> {
        self.entries.iter().find(|(p, _)| *p == privilege).map(|&(_, exp)| exp)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Privilege, u32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append the wire form of this set to `packer`.
    pub fn pack_into(&self, packer: &mut Packer) -> Result<(), TokenError> {
        packer.put_u16(length_prefix("privilege count", self.entries.len())?);
        for (privilege, expires_at) in self.iter() {
            packer.put_u16(privilege.code()).put_u32(expires_at);
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TokenError> {
        let mut packer = Packer::with_capacity(2 + 6 * self.entries.len());
        self.pack_into(&mut packer)?;
        Ok(packer.into_bytes())
    }
}
