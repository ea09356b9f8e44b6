/// CSV export of query results.
use super::duplicates::DuplicateGroup;
use super::file_types::TypeStats;
use crate::error::Result;
use crate::model::{DirectoryNode, FileNode, Node};
use chrono::{DateTime, Utc};
use std::io::Write;

fn rfc3339(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.to_rfc3339()).unwrap_or_default()
}

/// Write a node listing (largest, recent, search hits).
pub fn write_nodes<W: Write>(out: W, nodes: &[&Node]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["type", "path", "size", "content_type", "mtime", "ctime", "atime"])?;
    for node in nodes {
        let content_type = node.as_file().map(|f| f.content_type.as_str()).unwrap_or("");
        let times = node.times();
        wtr.write_record([
            node.kind_label(),
            node.path(),
            &node.size().to_string(),
            content_type,
            &rfc3339(times.mtime),
            &rfc3339(times.ctime),
            &rfc3339(times.atime),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a flat file listing (duplicates, garbage).
pub fn write_files<W: Write>(out: W, files: &[&FileNode]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["path", "name", "size", "content_type", "mtime"])?;
    for file in files {
        wtr.write_record([
            file.path.as_str(),
            file.name.as_str(),
            &file.size.to_string(),
            file.content_type.as_str(),
            &rfc3339(file.times.mtime),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a directory listing (empty directories).
pub fn write_dirs<W: Write>(out: W, dirs: &[&DirectoryNode]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["path", "name", "mtime"])?;
    for dir in dirs {
        wtr.write_record([dir.path.as_str(), dir.name.as_str(), &rfc3339(dir.times.mtime)])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write duplicate groups, one row per member.
pub fn write_duplicate_groups<W: Write>(out: W, groups: &[DuplicateGroup<'_>]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["group", "name", "size", "path"])?;
    for (i, group) in groups.iter().enumerate() {
        let id = (i + 1).to_string();
        let size = group.size.to_string();
        for file in &group.files {
            wtr.write_record([id.as_str(), group.name, &size, file.path.as_str()])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Write type-frequency statistics.
pub fn write_type_stats<W: Write>(out: W, stats: &[TypeStats]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["key", "count", "total_size", "count_percent", "size_percent"])?;
    for s in stats {
        wtr.write_record([
            s.key.as_str(),
            &s.count.to_string(),
            &s.total_size.to_string(),
            &format!("{:.2}", s.count_share),
            &format!("{:.2}", s.size_share),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Timestamps;

    fn file() -> FileNode {
        FileNode {
            name: "a,b.txt".into(),
            path: "/r/a,b.txt".into(),
            content_type: "text/plain".into(),
            size: 12,
            attrs: None,
            times: Timestamps {
                mtime: DateTime::from_timestamp(0, 0),
                ..Timestamps::default()
            },
        }
    }

    #[test]
    fn node_listing_quotes_fields_and_formats_times() {
        let node = Node::File(file());
        let mut buf = Vec::new();
        write_nodes(&mut buf, &[&node]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("type,path,size,content_type,mtime,ctime,atime")
        );
        assert_eq!(
            lines.next(),
            Some(r#"file,"/r/a,b.txt",12,text/plain,1970-01-01T00:00:00+00:00,,"#)
        );
    }

    #[test]
    fn type_stats_use_two_decimals() {
        let stats = [TypeStats {
            key: ".txt".into(),
            count: 1,
            total_size: 3,
            count_share: 100.0,
            size_share: 100.0 / 3.0,
        }];
        let mut buf = Vec::new();
        write_type_stats(&mut buf, &stats).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with(".txt,1,3,100.00,33.33\n"), "{text}");
    }

    #[test]
    fn dir_listing_has_one_row_per_dir() {
        let dir = DirectoryNode::new("empty".into(), "/r/empty".into());
        let mut buf = Vec::new();
        write_dirs(&mut buf, &[&dir]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "path,name,mtime\n/r/empty,empty,\n");
    }

    #[test]
    fn duplicate_groups_number_their_rows() {
        let f = file();
        let g = f.clone();
        let groups = [DuplicateGroup {
            name: "a,b.txt",
            size: 12,
            files: vec![&f, &g],
        }];
        let mut buf = Vec::new();
        write_duplicate_groups(&mut buf, &groups).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().skip(1).all(|l| l.starts_with("1,")));
    }
}
