//! Human-readable rendering of identification results

use fileid_core::identification::Identification;
use std::path::Path;

pub fn print_identification(path: &Path, result: &Identification) {
    if let Some(record) = &result.record {
        println!("{}", path.display());
        println!("  fid:      {}", record.fid);
        if let Some(name) = &record.romaji_name {
            println!("  anime:    {name}");
        }
        if let Some(english) = &record.english_name {
            println!("  english:  {english}");
        }
        if let (Some(number), name) = (&record.episode_number, &record.episode_name) {
            match name {
                Some(name) => println!("  episode:  {number} - {name}"),
                None => println!("  episode:  {number}"),
            }
        }
        if let Some(group) = &record.group_name {
            match &record.group_short_name {
                Some(short) => println!("  group:    {group} [{short}]"),
                None => println!("  group:    {group}"),
            }
        }
        if let Some(resolution) = &record.video_resolution {
            println!("  video:    {resolution}");
        }
        println!("  ed2k:     {}", result.fingerprint);
    } else {
        println!("{}: not in the catalog", path.display());
        println!("  ed2k:     {}", result.fingerprint);
        println!("  size:     {}", result.size);
    }
}
