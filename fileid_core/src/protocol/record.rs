//! Mask-driven decoding of FILE payloads
//!
//! A 220 FILE payload is a single pipe-delimited line: the file id first,
//! then one field per set `fmask` bit, then one per set `amask` bit, in the
//! wire order the mask tables define. The decoder consumes positionally and
//! is tolerant at both ends: a short payload leaves trailing fields unset, a
//! long one keeps the remainder in `extra_fields` instead of discarding it.
//! List-valued fields use a single quote as the internal separator.

use crate::protocol::error::{ProtocolError, Result};
use crate::protocol::masks::{Amask, AnimeField, FileField, Fmask};
use serde::Serialize;

/// Decoded FILE record. Every field except `fid` is optional; which ones are
/// populated depends on the masks the lookup was issued with and on how many
/// fields the server actually sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileRecord {
    pub fid: u64,
    pub aid: Option<u64>,
    pub eid: Option<u64>,
    pub gid: Option<u64>,
    pub lid: Option<u64>,
    pub other_episodes: Option<String>,
    pub deprecated: Option<bool>,
    pub state: Option<u32>,
    pub size: Option<u64>,
    pub ed2k: Option<String>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub crc32: Option<String>,
    pub video_colour_depth: Option<String>,
    pub quality: Option<String>,
    pub source: Option<String>,
    pub audio_codecs: Vec<String>,
    pub audio_bitrates: Vec<String>,
    pub video_codec: Option<String>,
    pub video_bitrate: Option<String>,
    pub video_resolution: Option<String>,
    pub file_extension: Option<String>,
    pub dub_languages: Vec<String>,
    pub sub_languages: Vec<String>,
    pub length_seconds: Option<u32>,
    pub description: Option<String>,
    pub aired_date: Option<u64>,
    pub anidb_file_name: Option<String>,

    pub total_episodes: Option<u32>,
    pub highest_episode: Option<u32>,
    pub year: Option<String>,
    pub anime_type: Option<String>,
    pub related_aids: Vec<String>,
    pub related_aid_types: Vec<String>,
    pub categories: Vec<String>,
    pub romaji_name: Option<String>,
    pub kanji_name: Option<String>,
    pub english_name: Option<String>,
    pub other_names: Vec<String>,
    pub short_names: Vec<String>,
    pub synonyms: Vec<String>,
    pub episode_number: Option<String>,
    pub episode_name: Option<String>,
    pub episode_romaji_name: Option<String>,
    pub episode_kanji_name: Option<String>,
    pub episode_rating: Option<String>,
    pub episode_vote_count: Option<String>,
    pub group_name: Option<String>,
    pub group_short_name: Option<String>,
    pub date_aid_updated: Option<u64>,

    /// Fields past the last one the masks account for.
    pub extra_fields: Vec<String>,
    /// The payload exactly as it arrived.
    pub raw: String,
}

impl FileRecord {
    /// Decode a 220 FILE payload under the masks the lookup carried.
    pub fn decode(payload: &str, fmask: Fmask, amask: Amask) -> Result<Self> {
        let mut record = FileRecord {
            raw: payload.to_string(),
            ..Default::default()
        };

        let mut fields = payload.split('|');

        let fid = fields
            .next()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| ProtocolError::framing("FILE payload missing file id"))?;
        record.fid = fid
            .parse()
            .map_err(|_| ProtocolError::framing(format!("unparseable file id: {fid:?}")))?;

        for field in fmask.fields() {
            let Some(value) = fields.next() else {
                return Ok(record);
            };
            record.apply_file_field(field, value);
        }

        for field in amask.fields() {
            let Some(value) = fields.next() else {
                return Ok(record);
            };
            record.apply_anime_field(field, value);
        }

        record.extra_fields = fields.map(|f| decode_text(f)).collect();
        Ok(record)
    }

    fn apply_file_field(&mut self, field: FileField, value: &str) {
        match field {
            FileField::Aid => self.aid = value.parse().ok(),
            FileField::Eid => self.eid = value.parse().ok(),
            FileField::Gid => self.gid = value.parse().ok(),
            FileField::Lid => self.lid = value.parse().ok(),
            FileField::OtherEpisodes => self.other_episodes = text(value),
            FileField::Deprecated => self.deprecated = value.parse::<u8>().ok().map(|v| v != 0),
            FileField::State => self.state = value.parse().ok(),
            FileField::Size => self.size = value.parse().ok(),
            FileField::Ed2k => self.ed2k = text(value),
            FileField::Md5 => self.md5 = text(value),
            FileField::Sha1 => self.sha1 = text(value),
            FileField::Crc32 => self.crc32 = text(value),
            FileField::VideoColourDepth => self.video_colour_depth = text(value),
            FileField::Quality => self.quality = text(value),
            FileField::Source => self.source = text(value),
            FileField::AudioCodecs => self.audio_codecs = list(value),
            FileField::AudioBitrates => self.audio_bitrates = list(value),
            FileField::VideoCodec => self.video_codec = text(value),
            FileField::VideoBitrate => self.video_bitrate = text(value),
            FileField::VideoResolution => self.video_resolution = text(value),
            FileField::FileExtension => self.file_extension = text(value),
            FileField::DubLanguages => self.dub_languages = list(value),
            FileField::SubLanguages => self.sub_languages = list(value),
            FileField::LengthSeconds => self.length_seconds = value.parse().ok(),
            FileField::Description => self.description = text(value),
            FileField::AiredDate => self.aired_date = value.parse().ok(),
            FileField::AnidbFileName => self.anidb_file_name = text(value),
        }
    }

    fn apply_anime_field(&mut self, field: AnimeField, value: &str) {
        match field {
            AnimeField::TotalEpisodes => self.total_episodes = value.parse().ok(),
            AnimeField::HighestEpisode => self.highest_episode = value.parse().ok(),
            AnimeField::Year => self.year = text(value),
            AnimeField::Type => self.anime_type = text(value),
            AnimeField::RelatedAids => self.related_aids = list(value),
            AnimeField::RelatedAidTypes => self.related_aid_types = list(value),
            AnimeField::Categories => self.categories = list(value),
            AnimeField::RomajiName => self.romaji_name = text(value),
            AnimeField::KanjiName => self.kanji_name = text(value),
            AnimeField::EnglishName => self.english_name = text(value),
            AnimeField::OtherNames => self.other_names = list(value),
            AnimeField::ShortNames => self.short_names = list(value),
            AnimeField::Synonyms => self.synonyms = list(value),
            AnimeField::EpisodeNumber => self.episode_number = text(value),
            AnimeField::EpisodeName => self.episode_name = text(value),
            AnimeField::EpisodeRomajiName => self.episode_romaji_name = text(value),
            AnimeField::EpisodeKanjiName => self.episode_kanji_name = text(value),
            AnimeField::EpisodeRating => self.episode_rating = text(value),
            AnimeField::EpisodeVoteCount => self.episode_vote_count = text(value),
            AnimeField::GroupName => self.group_name = text(value),
            AnimeField::GroupShortName => self.group_short_name = text(value),
            AnimeField::DateAidUpdated => self.date_aid_updated = value.parse().ok(),
        }
    }
}

/// Undo the server's in-band escapes: `<br />` carries a newline, a backtick
/// carries a quote (the plain quote being the list separator).
fn decode_text(value: &str) -> String {
    value.replace("<br />", "\n").replace('`', "'")
}

fn text(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(decode_text(value))
    }
}

fn list(value: &str) -> Vec<String> {
    if value.is_empty() {
        Vec::new()
    } else {
        value.split('\'').map(|v| decode_text(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_minimal_mask() {
        // fmask selects aid and size only.
        let mask = Fmask(0x4000_0000 | 0x0080_0000);
        let record = FileRecord::decode("312498|4896|233647104", mask, Amask(0)).unwrap();

        assert_eq!(record.fid, 312498);
        assert_eq!(record.aid, Some(4896));
        assert_eq!(record.size, Some(233647104));
        assert!(record.extra_fields.is_empty());
        assert_eq!(record.raw, "312498|4896|233647104");
    }

    #[test]
    fn test_decode_default_masks_in_order() {
        // fid + 17 fmask fields + 11 amask fields
        let payload = "312498|4896|69260|41|0|1|233647104|ec2d76e17ae3eef393c39392afeca308|a200fe73|high|DTV|AAC|H264/AVC|1280x720|jpn|eng'ger|1420|desc here|1236988800|Seirei no Moribito|精霊の守り人|Moribito|moribito'seirei|guardian of the sacred spirit|10|The Two of Them|futari|二人|Some Group|SG";
        let record =
            FileRecord::decode(payload, Fmask::DEFAULT, Amask::DEFAULT).unwrap();

        assert_eq!(record.fid, 312498);
        assert_eq!(record.aid, Some(4896));
        assert_eq!(record.eid, Some(69260));
        assert_eq!(record.gid, Some(41));
        assert_eq!(record.lid, Some(0));
        assert_eq!(record.state, Some(1));
        assert_eq!(record.size, Some(233647104));
        assert_eq!(
            record.ed2k.as_deref(),
            Some("ec2d76e17ae3eef393c39392afeca308")
        );
        assert_eq!(record.crc32.as_deref(), Some("a200fe73"));
        assert_eq!(record.quality.as_deref(), Some("high"));
        assert_eq!(record.source.as_deref(), Some("DTV"));
        assert_eq!(record.audio_codecs, vec!["AAC"]);
        assert_eq!(record.video_codec.as_deref(), Some("H264/AVC"));
        assert_eq!(record.video_resolution.as_deref(), Some("1280x720"));
        assert_eq!(record.dub_languages, vec!["jpn"]);
        assert_eq!(record.sub_languages, vec!["eng", "ger"]);
        assert_eq!(record.length_seconds, Some(1420));
        assert_eq!(record.description.as_deref(), Some("desc here"));
        assert_eq!(record.aired_date, Some(1236988800));
        assert_eq!(record.romaji_name.as_deref(), Some("Seirei no Moribito"));
        assert_eq!(record.kanji_name.as_deref(), Some("精霊の守り人"));
        assert_eq!(record.english_name.as_deref(), Some("Moribito"));
        assert_eq!(record.short_names, vec!["moribito", "seirei"]);
        assert_eq!(
            record.synonyms,
            vec!["guardian of the sacred spirit"]
        );
        assert_eq!(record.episode_number.as_deref(), Some("10"));
        assert_eq!(record.episode_name.as_deref(), Some("The Two of Them"));
        assert_eq!(record.episode_romaji_name.as_deref(), Some("futari"));
        assert_eq!(record.episode_kanji_name.as_deref(), Some("二人"));
        assert_eq!(record.group_name.as_deref(), Some("Some Group"));
        assert_eq!(record.group_short_name.as_deref(), Some("SG"));
        assert!(record.extra_fields.is_empty());
    }

    #[test]
    fn test_short_payload_leaves_trailing_fields_unset() {
        let record =
            FileRecord::decode("100|200|300", Fmask::DEFAULT, Amask::DEFAULT).unwrap();
        assert_eq!(record.fid, 100);
        assert_eq!(record.aid, Some(200));
        assert_eq!(record.eid, Some(300));
        assert_eq!(record.gid, None);
        assert_eq!(record.size, None);
        assert_eq!(record.romaji_name, None);
    }

    #[test]
    fn test_long_payload_overflows_into_extra_fields() {
        let mask = Fmask(0x4000_0000); // aid only
        let record =
            FileRecord::decode("1|2|surplus one|surplus two", mask, Amask(0)).unwrap();
        assert_eq!(record.fid, 1);
        assert_eq!(record.aid, Some(2));
        assert_eq!(record.extra_fields, vec!["surplus one", "surplus two"]);
        assert_eq!(record.raw, "1|2|surplus one|surplus two");
    }

    #[test]
    fn test_empty_values_stay_unset() {
        let mask = Fmask(0x4000_0000 | 0x0040_0000 | 0x0000_0040);
        let record = FileRecord::decode("7||", mask, Amask(0)).unwrap();
        assert_eq!(record.fid, 7);
        assert_eq!(record.aid, None);
        assert_eq!(record.ed2k, None);
        assert!(record.sub_languages.is_empty());
    }

    #[test]
    fn test_escapes_are_decoded() {
        let mask = Fmask(0x0000_0010); // description only
        let record =
            FileRecord::decode("1|line one<br />it`s line two", mask, Amask(0)).unwrap();
        assert_eq!(
            record.description.as_deref(),
            Some("line one\nit's line two")
        );
    }

    #[test]
    fn test_missing_fid_is_an_error() {
        assert!(FileRecord::decode("", Fmask::DEFAULT, Amask::DEFAULT).is_err());
        assert!(FileRecord::decode("notanumber|2", Fmask::DEFAULT, Amask::DEFAULT).is_err());
    }
}
