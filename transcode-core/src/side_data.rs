//! Typed side-channel metadata attached to media units and coders.
//!
//! A [`SideDataSet`] is an ordered list of entries keyed by a closed enum
//! ([`PacketSideDataType`] or [`FrameSideDataType`]). Each key declares static
//! [`SideDataProps`]: whether it is meaningful at stream scope (`GLOBAL`) and
//! whether several entries of it may coexist (`MULTI`). Duplicate handling is
//! chosen per call with an [`AddPolicy`].
//!
//! Payloads are either opaque bytes in a [`SharedBuffer`] or a typed
//! [`SideDataValue`]; typed values serialize to a fixed little- or big-endian
//! layout so they can cross into byte-oriented collaborators unchanged.

use crate::buffer::SharedBuffer;
use crate::error::{Error, Result};
use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::borrow::Cow;
use std::fmt;
use std::hash::Hash;
use std::io::Cursor;

bitflags! {
    /// Static properties of a side data type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SideDataProps: u32 {
        /// Meaningful for a whole stream, may be attached to a coder.
        const GLOBAL = 0x0001;
        /// Several entries of this type may coexist in one set.
        const MULTI = 0x0002;
    }
}

/// A closed enumeration usable as a side data key.
pub trait SideDataKind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Human readable name.
    fn name(&self) -> &'static str;

    /// Static multiplicity and scope rules.
    fn props(&self) -> SideDataProps;

    /// Typed payload layout, if this type has one.
    fn value_kind(&self) -> Option<ValueKind>;
}

macro_rules! side_data_types {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => ($label:expr, $props:expr, $value:expr)
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl SideDataKind for $name {
            fn name(&self) -> &'static str {
                match self { $( Self::$variant => $label ),+ }
            }

            fn props(&self) -> SideDataProps {
                match self { $( Self::$variant => $props ),+ }
            }

            fn value_kind(&self) -> Option<ValueKind> {
                match self { $( Self::$variant => $value ),+ }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

const NONE: SideDataProps = SideDataProps::empty();
const GLOBAL: SideDataProps = SideDataProps::GLOBAL;
const MULTI: SideDataProps = SideDataProps::MULTI;

side_data_types! {
    /// Side data carried by compressed units.
    pub enum PacketSideDataType {
        /// Palette for paletted formats.
        Palette => ("Palette", NONE, None),
        /// Replacement out-of-band configuration bytes.
        NewExtradata => ("New Extradata", NONE, None),
        /// Mid-stream parameter change.
        ParamChange => ("Param Change", NONE, None),
        /// ReplayGain loudness information.
        ReplayGain => ("Replay Gain", GLOBAL, Some(ValueKind::ReplayGain)),
        /// 3x3 display transformation matrix.
        DisplayMatrix => ("Display Matrix", GLOBAL, Some(ValueKind::DisplayMatrix)),
        /// Stereoscopic 3D packing.
        Stereo3d => ("Stereo 3D", GLOBAL, None),
        /// Audio service type.
        AudioServiceType => ("Audio Service Type", GLOBAL, None),
        /// Encoder quality statistics.
        QualityStats => ("Quality stats", NONE, None),
        /// Coded picture buffer properties.
        CpbProperties => ("CPB properties", GLOBAL, None),
        /// Samples to discard at the start or end of the decoded output.
        SkipSamples => ("Skip Samples", NONE, Some(ValueKind::SkipSamples)),
        /// Mastering display color volume.
        MasteringDisplayMetadata => (
            "Mastering display metadata",
            GLOBAL,
            Some(ValueKind::MasteringDisplay)
        ),
        /// Content light level.
        ContentLightLevel => (
            "Content light level metadata",
            GLOBAL,
            Some(ValueKind::ContentLightLevel)
        ),
        /// ATSC A53 closed captions.
        A53ClosedCaptions => ("ATSC A53 Part 4 Closed Captions", NONE, None),
        /// Active format description.
        Afd => ("Active Format Description data", NONE, Some(ValueKind::Afd)),
        /// ICC color profile.
        IccProfile => ("ICC Profile", GLOBAL, None),
        /// SMPTE 12-1 timecode.
        S12mTimecode => ("SMPTE ST 12-1:2014 timecode", NONE, Some(ValueKind::Timecode)),
        /// HDR10+ dynamic metadata.
        DynamicHdr10Plus => ("HDR10+ Dynamic Metadata (SMPTE 2094-40)", NONE, None),
    }
}

side_data_types! {
    /// Side data carried by raw units.
    pub enum FrameSideDataType {
        /// Pan-scan rectangle.
        PanScan => ("AVPanScan", NONE, None),
        /// ATSC A53 closed captions.
        A53ClosedCaptions => ("ATSC A53 Part 4 Closed Captions", NONE, None),
        /// Stereoscopic 3D packing.
        Stereo3d => ("Stereo 3D", GLOBAL, None),
        /// Matrix encoding of stereo audio.
        MatrixEncoding => ("AVMatrixEncoding", NONE, None),
        /// Downmix coefficients.
        DownmixInfo => ("Metadata relevant to a downmix procedure", NONE, None),
        /// ReplayGain loudness information.
        ReplayGain => ("AVReplayGain", GLOBAL, Some(ValueKind::ReplayGain)),
        /// 3x3 display transformation matrix.
        DisplayMatrix => ("3x3 displaymatrix", GLOBAL, Some(ValueKind::DisplayMatrix)),
        /// Active format description.
        Afd => ("Active format description", NONE, Some(ValueKind::Afd)),
        /// Motion vectors exported by a decoder.
        MotionVectors => ("Motion vectors", NONE, None),
        /// Samples to discard at the start or end of this frame.
        SkipSamples => ("Skip samples", NONE, Some(ValueKind::SkipSamples)),
        /// Audio service type.
        AudioServiceType => ("Audio service type", GLOBAL, None),
        /// Mastering display color volume.
        MasteringDisplayMetadata => (
            "Mastering display metadata",
            GLOBAL,
            Some(ValueKind::MasteringDisplay)
        ),
        /// GOP timecode.
        GopTimecode => ("GOP timecode", NONE, Some(ValueKind::Timecode)),
        /// Spherical video mapping.
        Spherical => ("Spherical Mapping", GLOBAL, None),
        /// Content light level.
        ContentLightLevel => (
            "Content light level metadata",
            GLOBAL,
            Some(ValueKind::ContentLightLevel)
        ),
        /// ICC color profile.
        IccProfile => ("ICC profile", GLOBAL, None),
        /// SMPTE 12-1 timecode.
        S12mTimecode => ("SMPTE 12-1 timecode", NONE, Some(ValueKind::Timecode)),
        /// HDR10+ dynamic metadata.
        DynamicHdrPlus => ("HDR Dynamic Metadata SMPTE2094-40 (HDR10+)", NONE, None),
        /// Encoder regions of interest.
        RegionsOfInterest => ("Regions Of Interest", NONE, None),
        /// Unregistered user data SEI payloads.
        SeiUnregistered => ("H.26[45] User Data Unregistered SEI message", MULTI, None),
        /// Film grain synthesis parameters.
        FilmGrainParams => ("Film grain parameters", MULTI, None),
        /// Ambient viewing environment.
        AmbientViewingEnvironment => ("Ambient viewing environment", GLOBAL, None),
    }
}

impl PacketSideDataType {
    /// Frame side data a decoder derives from this packet side data.
    pub fn frame_type(&self) -> Option<FrameSideDataType> {
        use FrameSideDataType as F;
        Some(match self {
            Self::ReplayGain => F::ReplayGain,
            Self::DisplayMatrix => F::DisplayMatrix,
            Self::Stereo3d => F::Stereo3d,
            Self::AudioServiceType => F::AudioServiceType,
            Self::MasteringDisplayMetadata => F::MasteringDisplayMetadata,
            Self::ContentLightLevel => F::ContentLightLevel,
            Self::A53ClosedCaptions => F::A53ClosedCaptions,
            Self::IccProfile => F::IccProfile,
            Self::S12mTimecode => F::S12mTimecode,
            Self::SkipSamples => F::SkipSamples,
            Self::Afd => F::Afd,
            Self::DynamicHdr10Plus => F::DynamicHdrPlus,
            Self::Palette
            | Self::NewExtradata
            | Self::ParamChange
            | Self::QualityStats
            | Self::CpbProperties => return None,
        })
    }
}

/// Serialized layouts understood by [`SideDataValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Nine little-endian `i32`, 16.16 fixed point except the last column (2.30).
    DisplayMatrix,
    /// `u32` start, `u32` end, `u8` start reason, `u8` end reason (little-endian).
    SkipSamples,
    /// `u16` MaxCLL, `u16` MaxFALL (little-endian).
    ContentLightLevel,
    /// ISO/IEC 23001-8 `mdcv` layout, big-endian, 24 bytes.
    MasteringDisplay,
    /// Track gain/peak and album gain/peak, `i32`/`u32` pairs (little-endian).
    ReplayGain,
    /// Single AFD byte.
    Afd,
    /// Packed 64-bit timecode (little-endian).
    Timecode,
}

impl ValueKind {
    /// Exact serialized size in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::DisplayMatrix => 36,
            Self::SkipSamples => 10,
            Self::ContentLightLevel => 4,
            Self::MasteringDisplay => 24,
            Self::ReplayGain => 16,
            Self::Afd => 1,
            Self::Timecode => 8,
        }
    }
}

/// Mastering display color volume, in `mdcv` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MasteringDisplay {
    /// (x, y) of the G, B, R primaries in increments of 0.00002.
    pub display_primaries: [[u16; 2]; 3],
    /// (x, y) of the white point in increments of 0.00002.
    pub white_point: [u16; 2],
    /// Maximum luminance in 0.0001 cd/m².
    pub max_luminance: u32,
    /// Minimum luminance in 0.0001 cd/m².
    pub min_luminance: u32,
}

/// A decoded, typed side data payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SideDataValue {
    /// Display transformation matrix.
    DisplayMatrix([i32; 9]),
    /// Gapless playback trimming.
    SkipSamples {
        skip_start: u32,
        skip_end: u32,
        start_reason: u8,
        end_reason: u8,
    },
    /// Content light level.
    ContentLightLevel { max_cll: u16, max_fall: u16 },
    /// Mastering display metadata.
    MasteringDisplay(MasteringDisplay),
    /// ReplayGain values; gains in 1/100000 dB, peaks in 1/100000 of full scale.
    ReplayGain {
        track_gain: i32,
        track_peak: u32,
        album_gain: i32,
        album_peak: u32,
    },
    /// Active format description code.
    Afd(u8),
    /// Packed timecode.
    Timecode(u64),
}

impl SideDataValue {
    /// Layout of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::DisplayMatrix(_) => ValueKind::DisplayMatrix,
            Self::SkipSamples { .. } => ValueKind::SkipSamples,
            Self::ContentLightLevel { .. } => ValueKind::ContentLightLevel,
            Self::MasteringDisplay(_) => ValueKind::MasteringDisplay,
            Self::ReplayGain { .. } => ValueKind::ReplayGain,
            Self::Afd(_) => ValueKind::Afd,
            Self::Timecode(_) => ValueKind::Timecode,
        }
    }

    /// Serialize to the fixed layout of [`ValueKind`].
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.kind().encoded_len()];
        match *self {
            Self::DisplayMatrix(m) => LittleEndian::write_i32_into(&m, &mut out),
            Self::SkipSamples {
                skip_start,
                skip_end,
                start_reason,
                end_reason,
            } => {
                LittleEndian::write_u32(&mut out[0..4], skip_start);
                LittleEndian::write_u32(&mut out[4..8], skip_end);
                out[8] = start_reason;
                out[9] = end_reason;
            }
            Self::ContentLightLevel { max_cll, max_fall } => {
                LittleEndian::write_u16(&mut out[0..2], max_cll);
                LittleEndian::write_u16(&mut out[2..4], max_fall);
            }
            Self::MasteringDisplay(md) => {
                let mut w = &mut out[..];
                for xy in md.display_primaries.iter().chain(std::iter::once(&md.white_point)) {
                    for &c in xy {
                        // Writing into a fixed-size slice of the exact length cannot fail.
                        let _ = w.write_u16::<BigEndian>(c);
                    }
                }
                let _ = w.write_u32::<BigEndian>(md.max_luminance);
                let _ = w.write_u32::<BigEndian>(md.min_luminance);
            }
            Self::ReplayGain {
                track_gain,
                track_peak,
                album_gain,
                album_peak,
            } => {
                LittleEndian::write_i32(&mut out[0..4], track_gain);
                LittleEndian::write_u32(&mut out[4..8], track_peak);
                LittleEndian::write_i32(&mut out[8..12], album_gain);
                LittleEndian::write_u32(&mut out[12..16], album_peak);
            }
            Self::Afd(code) => out[0] = code,
            Self::Timecode(tc) => LittleEndian::write_u64(&mut out, tc),
        }
        out
    }

    /// Parse bytes laid out as `kind`.
    pub fn decode(kind: ValueKind, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != kind.encoded_len() {
            return Err(Error::invalid_param(format!(
                "{kind:?} side data must be {} bytes, got {}",
                kind.encoded_len(),
                bytes.len()
            )));
        }
        let truncated = |_| Error::invalid_param(format!("truncated {kind:?} side data"));
        let mut r = Cursor::new(bytes);
        Ok(match kind {
            ValueKind::DisplayMatrix => {
                let mut m = [0i32; 9];
                r.read_i32_into::<LittleEndian>(&mut m).map_err(truncated)?;
                Self::DisplayMatrix(m)
            }
            ValueKind::SkipSamples => Self::SkipSamples {
                skip_start: r.read_u32::<LittleEndian>().map_err(truncated)?,
                skip_end: r.read_u32::<LittleEndian>().map_err(truncated)?,
                start_reason: r.read_u8().map_err(truncated)?,
                end_reason: r.read_u8().map_err(truncated)?,
            },
            ValueKind::ContentLightLevel => Self::ContentLightLevel {
                max_cll: r.read_u16::<LittleEndian>().map_err(truncated)?,
                max_fall: r.read_u16::<LittleEndian>().map_err(truncated)?,
            },
            ValueKind::MasteringDisplay => {
                let mut md = MasteringDisplay::default();
                for xy in md.display_primaries.iter_mut() {
                    for c in xy.iter_mut() {
                        *c = r.read_u16::<BigEndian>().map_err(truncated)?;
                    }
                }
                for c in md.white_point.iter_mut() {
                    *c = r.read_u16::<BigEndian>().map_err(truncated)?;
                }
                md.max_luminance = r.read_u32::<BigEndian>().map_err(truncated)?;
                md.min_luminance = r.read_u32::<BigEndian>().map_err(truncated)?;
                Self::MasteringDisplay(md)
            }
            ValueKind::ReplayGain => Self::ReplayGain {
                track_gain: r.read_i32::<LittleEndian>().map_err(truncated)?,
                track_peak: r.read_u32::<LittleEndian>().map_err(truncated)?,
                album_gain: r.read_i32::<LittleEndian>().map_err(truncated)?,
                album_peak: r.read_u32::<LittleEndian>().map_err(truncated)?,
            },
            ValueKind::Afd => Self::Afd(r.read_u8().map_err(truncated)?),
            ValueKind::Timecode => Self::Timecode(r.read_u64::<LittleEndian>().map_err(truncated)?),
        })
    }

    /// Display matrix rotating the picture counterclockwise by `degrees`.
    pub fn display_rotation(degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        let fixed = |v: f64| (v * 65536.0) as i32;
        let mut m = [0i32; 9];
        m[0] = fixed(c);
        m[1] = fixed(-s);
        m[3] = fixed(s);
        m[4] = fixed(c);
        m[8] = 1 << 30;
        Self::DisplayMatrix(m)
    }

    /// Counterclockwise rotation encoded by a display matrix, in degrees.
    pub fn rotation_degrees(&self) -> Option<f64> {
        let Self::DisplayMatrix(m) = self else {
            return None;
        };
        let scale0 = (m[0] as f64).hypot(m[3] as f64);
        let scale1 = (m[1] as f64).hypot(m[4] as f64);
        if scale0 == 0.0 || scale1 == 0.0 {
            return None;
        }
        let rotation = (m[1] as f64 / scale1).atan2(m[0] as f64 / scale0).to_degrees();
        Some(-rotation)
    }
}

/// Storage for one side data entry.
#[derive(Debug, Clone)]
pub enum SideDataPayload {
    /// Opaque reference-counted bytes.
    Buffer(SharedBuffer),
    /// Typed value stored inline.
    Value(SideDataValue),
}

impl From<SharedBuffer> for SideDataPayload {
    fn from(buf: SharedBuffer) -> Self {
        Self::Buffer(buf)
    }
}

impl From<SideDataValue> for SideDataPayload {
    fn from(value: SideDataValue) -> Self {
        Self::Value(value)
    }
}

/// One side data entry.
#[derive(Debug, Clone)]
pub struct SideData<K> {
    kind: K,
    payload: SideDataPayload,
}

impl<K: SideDataKind> SideData<K> {
    /// Type tag of this entry.
    pub fn kind(&self) -> K {
        self.kind
    }

    /// Raw payload.
    pub fn payload(&self) -> &SideDataPayload {
        &self.payload
    }

    /// Payload bytes; typed values are serialized on demand.
    pub fn bytes(&self) -> Cow<'_, [u8]> {
        match &self.payload {
            SideDataPayload::Buffer(buf) => Cow::Borrowed(buf.data()),
            SideDataPayload::Value(v) => Cow::Owned(v.encode()),
        }
    }

    /// Typed view, parsing byte payloads of types that have a layout.
    ///
    /// Returns `Ok(None)` for types without a typed form.
    pub fn value(&self) -> Result<Option<SideDataValue>> {
        match (&self.payload, self.kind.value_kind()) {
            (SideDataPayload::Value(v), _) => Ok(Some(*v)),
            (SideDataPayload::Buffer(buf), Some(kind)) => {
                SideDataValue::decode(kind, buf.data()).map(Some)
            }
            (SideDataPayload::Buffer(_), None) => Ok(None),
        }
    }

    /// Replace the payload in place.
    pub fn set_payload(&mut self, payload: impl Into<SideDataPayload>) -> Result<()> {
        let payload = payload.into();
        check_payload(self.kind, &payload)?;
        self.payload = payload;
        Ok(())
    }
}

/// How [`SideDataSet::add`] treats an existing entry of the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddPolicy {
    /// Remove every existing entry of the type, then add.
    #[default]
    Replace,
    /// Fail if an entry of the type already exists.
    RejectDuplicate,
    /// Add alongside existing entries; only legal for `MULTI` types.
    Append,
}

fn check_payload<K: SideDataKind>(kind: K, payload: &SideDataPayload) -> Result<()> {
    if let SideDataPayload::Value(v) = payload {
        if kind.value_kind() != Some(v.kind()) {
            return Err(Error::invalid_param(format!(
                "{:?} value cannot be stored as '{}' side data",
                v.kind(),
                kind.name()
            )));
        }
    }
    Ok(())
}

/// An ordered list of side data entries.
///
/// Cloning the set clones every entry; byte payloads gain a new reference to
/// the same [`SharedBuffer`] rather than being copied.
#[derive(Debug, Clone)]
pub struct SideDataSet<K> {
    entries: Vec<SideData<K>>,
}

impl<K> Default for SideDataSet<K> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K: SideDataKind> SideDataSet<K> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry under `policy`.
    ///
    /// On error the set is left unchanged.
    pub fn add(
        &mut self,
        kind: K,
        payload: impl Into<SideDataPayload>,
        policy: AddPolicy,
    ) -> Result<&mut SideData<K>> {
        let payload = payload.into();
        check_payload(kind, &payload)?;
        let exists = self.entries.iter().any(|e| e.kind == kind);
        match policy {
            AddPolicy::Replace => {
                self.entries.retain(|e| e.kind != kind);
            }
            AddPolicy::RejectDuplicate if exists => {
                return Err(Error::invalid_param(format!(
                    "side data '{}' already present",
                    kind.name()
                )));
            }
            AddPolicy::RejectDuplicate => {}
            AddPolicy::Append => {
                if !kind.props().contains(SideDataProps::MULTI) {
                    return Err(Error::invalid_param(format!(
                        "side data '{}' does not allow multiple entries",
                        kind.name()
                    )));
                }
            }
        }
        self.entries.push(SideData { kind, payload });
        let last = self.entries.len() - 1;
        Ok(&mut self.entries[last])
    }

    /// Add raw bytes, copying them into a fresh buffer.
    pub fn add_bytes(
        &mut self,
        kind: K,
        bytes: &[u8],
        policy: AddPolicy,
    ) -> Result<&mut SideData<K>> {
        let buf = SharedBuffer::copy_from_slice(bytes)?;
        self.add(kind, buf, policy)
    }

    /// First entry of `kind`.
    pub fn get(&self, kind: K) -> Option<&SideData<K>> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    /// Mutable first entry of `kind`.
    pub fn get_mut(&mut self, kind: K) -> Option<&mut SideData<K>> {
        self.entries.iter_mut().find(|e| e.kind == kind)
    }

    /// All entries of `kind`, in insertion order.
    pub fn get_all(&self, kind: K) -> impl Iterator<Item = &SideData<K>> + '_ {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Typed value of the first entry of `kind`.
    pub fn value(&self, kind: K) -> Result<Option<SideDataValue>> {
        match self.get(kind) {
            Some(entry) => entry.value(),
            None => Ok(None),
        }
    }

    /// Remove every entry of `kind`, returning how many were removed.
    pub fn remove(&mut self, kind: K) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.kind != kind);
        before - self.entries.len()
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Check whether any entry of `kind` exists.
    pub fn contains(&self, kind: K) -> bool {
        self.entries.iter().any(|e| e.kind == kind)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SideData<K>> + '_ {
        self.entries.iter()
    }
}
