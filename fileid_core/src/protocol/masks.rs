//! Field-selection bitmasks for FILE lookups
//!
//! The FILE command carries two hex-rendered masks: `fmask` selects file
//! fields, `amask` selects anime/episode/group fields. Each set bit makes the
//! server append one more pipe-delimited field to the payload, in the fixed
//! order defined by the tables below (most significant bit first). The same
//! masks drive decoding, so request and decoder can never disagree about
//! field order.

/// File fields selectable through `fmask`, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileField {
    Aid,
    Eid,
    Gid,
    Lid,
    OtherEpisodes,
    Deprecated,
    State,
    Size,
    Ed2k,
    Md5,
    Sha1,
    Crc32,
    VideoColourDepth,
    Quality,
    Source,
    AudioCodecs,
    AudioBitrates,
    VideoCodec,
    VideoBitrate,
    VideoResolution,
    FileExtension,
    DubLanguages,
    SubLanguages,
    LengthSeconds,
    Description,
    AiredDate,
    AnidbFileName,
}

/// (bit, field) table in decode order.
const FILE_FIELD_BITS: &[(u32, FileField)] = &[
    (0x4000_0000, FileField::Aid),
    (0x2000_0000, FileField::Eid),
    (0x1000_0000, FileField::Gid),
    (0x0800_0000, FileField::Lid),
    (0x0400_0000, FileField::OtherEpisodes),
    (0x0200_0000, FileField::Deprecated),
    (0x0100_0000, FileField::State),
    (0x0080_0000, FileField::Size),
    (0x0040_0000, FileField::Ed2k),
    (0x0020_0000, FileField::Md5),
    (0x0010_0000, FileField::Sha1),
    (0x0008_0000, FileField::Crc32),
    (0x0002_0000, FileField::VideoColourDepth),
    (0x0000_8000, FileField::Quality),
    (0x0000_4000, FileField::Source),
    (0x0000_2000, FileField::AudioCodecs),
    (0x0000_1000, FileField::AudioBitrates),
    (0x0000_0800, FileField::VideoCodec),
    (0x0000_0400, FileField::VideoBitrate),
    (0x0000_0200, FileField::VideoResolution),
    (0x0000_0100, FileField::FileExtension),
    (0x0000_0080, FileField::DubLanguages),
    (0x0000_0040, FileField::SubLanguages),
    (0x0000_0020, FileField::LengthSeconds),
    (0x0000_0010, FileField::Description),
    (0x0000_0008, FileField::AiredDate),
    (0x0000_0001, FileField::AnidbFileName),
];

/// Anime/episode/group fields selectable through `amask`, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimeField {
    TotalEpisodes,
    HighestEpisode,
    Year,
    Type,
    RelatedAids,
    RelatedAidTypes,
    Categories,
    RomajiName,
    KanjiName,
    EnglishName,
    OtherNames,
    ShortNames,
    Synonyms,
    EpisodeNumber,
    EpisodeName,
    EpisodeRomajiName,
    EpisodeKanjiName,
    EpisodeRating,
    EpisodeVoteCount,
    GroupName,
    GroupShortName,
    DateAidUpdated,
}

const ANIME_FIELD_BITS: &[(u32, AnimeField)] = &[
    (0x8000_0000, AnimeField::TotalEpisodes),
    (0x4000_0000, AnimeField::HighestEpisode),
    (0x2000_0000, AnimeField::Year),
    (0x1000_0000, AnimeField::Type),
    (0x0800_0000, AnimeField::RelatedAids),
    (0x0400_0000, AnimeField::RelatedAidTypes),
    (0x0200_0000, AnimeField::Categories),
    (0x0080_0000, AnimeField::RomajiName),
    (0x0040_0000, AnimeField::KanjiName),
    (0x0020_0000, AnimeField::EnglishName),
    (0x0010_0000, AnimeField::OtherNames),
    (0x0008_0000, AnimeField::ShortNames),
    (0x0004_0000, AnimeField::Synonyms),
    (0x0000_8000, AnimeField::EpisodeNumber),
    (0x0000_4000, AnimeField::EpisodeName),
    (0x0000_2000, AnimeField::EpisodeRomajiName),
    (0x0000_1000, AnimeField::EpisodeKanjiName),
    (0x0000_0800, AnimeField::EpisodeRating),
    (0x0000_0400, AnimeField::EpisodeVoteCount),
    (0x0000_0080, AnimeField::GroupName),
    (0x0000_0040, AnimeField::GroupShortName),
    (0x0000_0001, AnimeField::DateAidUpdated),
];

/// File field-selection mask, rendered as 8 hex digits on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fmask(pub u32);

impl Fmask {
    /// The selection used for identification lookups: ids, state, size,
    /// hashes, quality/codec fields, language lists and description.
    pub const DEFAULT: Fmask = Fmask(0x79C8_EAF8);

    pub fn hex(&self) -> String {
        format!("{:08X}", self.0)
    }

    /// Selected fields, in the order the server emits them.
    pub fn fields(&self) -> impl Iterator<Item = FileField> + '_ {
        FILE_FIELD_BITS
            .iter()
            .filter(move |(bit, _)| self.0 & bit != 0)
            .map(|(_, field)| *field)
    }
}

/// Anime field-selection mask, rendered as 8 hex digits on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amask(pub u32);

impl Amask {
    /// The selection used for identification lookups: anime name variants,
    /// episode name variants and group names.
    pub const DEFAULT: Amask = Amask(0x00EC_F0C0);

    pub fn hex(&self) -> String {
        format!("{:08X}", self.0)
    }

    pub fn fields(&self) -> impl Iterator<Item = AnimeField> + '_ {
        ANIME_FIELD_BITS
            .iter()
            .filter(move |(bit, _)| self.0 & bit != 0)
            .map(|(_, field)| *field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_rendering() {
        assert_eq!(Fmask::DEFAULT.hex(), "79C8EAF8");
        assert_eq!(Amask::DEFAULT.hex(), "00ECF0C0");
        assert_eq!(Fmask(0).hex(), "00000000");
    }

    #[test]
    fn test_fields_follow_wire_order() {
        let mask = Fmask(0x4000_0000 | 0x0080_0000 | 0x0000_0040);
        let fields: Vec<_> = mask.fields().collect();
        assert_eq!(
            fields,
            vec![FileField::Aid, FileField::Size, FileField::SubLanguages]
        );
    }

    #[test]
    fn test_default_fmask_selection() {
        let fields: Vec<_> = Fmask::DEFAULT.fields().collect();
        assert_eq!(fields[0], FileField::Aid);
        assert!(fields.contains(&FileField::Ed2k));
        assert!(fields.contains(&FileField::Crc32));
        assert!(!fields.contains(&FileField::Md5));
        assert!(!fields.contains(&FileField::Sha1));
    }

    #[test]
    fn test_default_amask_selection() {
        let fields: Vec<_> = Amask::DEFAULT.fields().collect();
        assert_eq!(
            fields,
            vec![
                AnimeField::RomajiName,
                AnimeField::KanjiName,
                AnimeField::EnglishName,
                AnimeField::ShortNames,
                AnimeField::Synonyms,
                AnimeField::EpisodeNumber,
                AnimeField::EpisodeName,
                AnimeField::EpisodeRomajiName,
                AnimeField::EpisodeKanjiName,
                AnimeField::GroupName,
                AnimeField::GroupShortName,
            ]
        );
    }
}
