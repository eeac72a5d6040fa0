use crate::core::StreamKind;
use crate::player::pipeline::SourceInfo;
use serde_json::Value;
use std::collections::BTreeMap;

/// 容器标签名 -> 对外的规范键名
const TAG_KEYS: &[(&str, &str)] = &[
    ("title", "Title"),
    ("artist", "ContributingArtist"),
    ("album_artist", "AlbumArtist"),
    ("album", "AlbumTitle"),
    ("genre", "Genre"),
    ("date", "Date"),
    ("year", "Date"),
    ("comment", "Comment"),
    ("description", "Description"),
    ("copyright", "Copyright"),
    ("language", "Language"),
    ("composer", "Composer"),
    ("publisher", "Publisher"),
];

/// 打开成功后把 Reader 的原始标签转换成对外的元数据表
///
/// 已知标签换成规范键名，未知标签原样保留；再补上从流信息推导的条目。
pub fn convert_metadata(info: &SourceInfo) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();

    for (raw_key, raw_value) in &info.tags {
        let value = raw_value.trim();
        if value.is_empty() {
            continue;
        }

        let lower = raw_key.to_ascii_lowercase();
        if lower == "track" || lower == "tracknumber" {
            // "3/12" 这种格式只取前半部分
            let number = value.split('/').next().unwrap_or(value).trim();
            match number.parse::<i64>() {
                Ok(n) => out.insert("TrackNumber".to_string(), Value::from(n)),
                Err(_) => out.insert("TrackNumber".to_string(), Value::from(value)),
            };
            continue;
        }

        match TAG_KEYS.iter().find(|(k, _)| *k == lower) {
            Some((_, canonical)) => {
                out.entry(canonical.to_string())
                    .or_insert_with(|| Value::from(value));
            }
            None => {
                out.insert(raw_key.clone(), Value::from(value));
            }
        }
    }

    out.insert("Duration".to_string(), Value::from(info.duration));
    out.insert("Seekable".to_string(), Value::from(info.seekable));
    if info.fps > 0.0 {
        out.insert("VideoFrameRate".to_string(), Value::from(info.fps));
    }
    if let Some(video) = info.first_stream(StreamKind::Video) {
        out.insert("VideoCodec".to_string(), Value::from(video.codec.clone()));
    }
    if let Some(audio) = info.first_stream(StreamKind::Audio) {
        out.insert("AudioCodec".to_string(), Value::from(audio.codec.clone()));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StreamInfo;

    #[test]
    fn test_convert_known_and_unknown_tags() {
        let mut info = SourceInfo {
            duration: 10_000,
            seekable: true,
            fps: 25.0,
            ..Default::default()
        };
        info.streams.push(StreamInfo {
            index: 0,
            kind: StreamKind::Video,
            codec: "h264".into(),
            language: None,
        });
        info.tags.insert("title".into(), "Big Buck Bunny".into());
        info.tags.insert("ARTIST".into(), "Blender".into());
        info.tags.insert("track".into(), "3/12".into());
        info.tags.insert("encoder".into(), "Lavf58".into());
        info.tags.insert("comment".into(), "   ".into());

        let meta = convert_metadata(&info);
        assert_eq!(meta["Title"], Value::from("Big Buck Bunny"));
        assert_eq!(meta["ContributingArtist"], Value::from("Blender"));
        assert_eq!(meta["TrackNumber"], Value::from(3));
        assert_eq!(meta["encoder"], Value::from("Lavf58"));
        assert_eq!(meta["Duration"], Value::from(10_000));
        assert_eq!(meta["VideoCodec"], Value::from("h264"));
        assert_eq!(meta["VideoFrameRate"], Value::from(25.0));
        assert!(!meta.contains_key("Comment"));
        assert!(!meta.contains_key("AudioCodec"));
    }
}
