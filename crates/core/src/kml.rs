//! KML document generation for photo tours.

use crate::tour::{PhotoTourEntry, TourOptions};
use std::fmt::Write as _;

const PHOTO_ICON: &str = "http://maps.google.com/mapfiles/kml/shapes/camera.png";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Escapes the five XML metacharacters.
pub fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Renders the whole `doc.kml`. Entries are expected in sequence order.
pub fn build_document(entries: &[PhotoTourEntry], options: &TourOptions) -> String {
    let mut kml = String::new();
    kml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    kml.push_str("<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n");
    kml.push_str("  <Document>\n");
    let _ = writeln!(kml, "    <name>{}</name>", xml_escape(&options.title));
    let _ = writeln!(
        kml,
        "    <description>{}</description>",
        xml_escape(&options.description)
    );
    push_styles(&mut kml);

    for entry in entries {
        push_photo_placemark(&mut kml, entry, options);
    }

    if options.draw_path && entries.len() >= 2 {
        push_path_placemark(&mut kml, entries);
    }

    kml.push_str("  </Document>\n");
    kml.push_str("</kml>\n");
    kml
}

fn push_styles(kml: &mut String) {
    kml.push_str("    <Style id=\"photoStyle\">\n");
    kml.push_str("      <IconStyle>\n");
    kml.push_str("        <scale>1.2</scale>\n");
    let _ = writeln!(kml, "        <Icon><href>{PHOTO_ICON}</href></Icon>");
    kml.push_str("      </IconStyle>\n");
    kml.push_str("      <BalloonStyle><text>$[description]</text></BalloonStyle>\n");
    kml.push_str("    </Style>\n");
    kml.push_str("    <Style id=\"pathStyle\">\n");
    kml.push_str("      <LineStyle>\n");
    kml.push_str("        <color>ff0000ff</color>\n");
    kml.push_str("        <width>3</width>\n");
    kml.push_str("      </LineStyle>\n");
    kml.push_str("    </Style>\n");
}

fn push_photo_placemark(kml: &mut String, entry: &PhotoTourEntry, options: &TourOptions) {
    let name = if options.number_photos {
        format!("{}. {}", entry.sequence, entry.id)
    } else {
        entry.id.clone()
    };

    kml.push_str("    <Placemark>\n");
    let _ = writeln!(kml, "      <name>{}</name>", xml_escape(&name));
    let _ = writeln!(
        kml,
        "      <description><![CDATA[{}]]></description>",
        balloon_html(entry, options)
    );
    kml.push_str("      <styleUrl>#photoStyle</styleUrl>\n");
    let _ = writeln!(
        kml,
        "      <TimeStamp><when>{}</when></TimeStamp>",
        entry.timestamp.format(TIMESTAMP_FORMAT)
    );
    let _ = writeln!(
        kml,
        "      <Point><coordinates>{}</coordinates></Point>",
        coordinate_tuple(entry)
    );
    kml.push_str("    </Placemark>\n");
}

fn push_path_placemark(kml: &mut String, entries: &[PhotoTourEntry]) {
    kml.push_str("    <Placemark>\n");
    kml.push_str("      <name>Photo path</name>\n");
    kml.push_str("      <styleUrl>#pathStyle</styleUrl>\n");
    kml.push_str("      <LineString>\n");
    kml.push_str("        <tessellate>1</tessellate>\n");
    kml.push_str("        <coordinates>\n");
    for entry in entries {
        let _ = writeln!(kml, "          {}", coordinate_tuple(entry));
    }
    kml.push_str("        </coordinates>\n");
    kml.push_str("      </LineString>\n");
    kml.push_str("    </Placemark>\n");
}

/// Balloon body. Every interpolated value is escaped, so the block can
/// never contain `]]>`.
fn balloon_html(entry: &PhotoTourEntry, options: &TourOptions) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<img src=\"{}\" width=\"{}\"/><br/>",
        xml_escape(&entry.thumbnail),
        options.thumbnail_size
    );
    let _ = write!(
        html,
        "<b>Date:</b> {}<br/>",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(camera) = &entry.camera {
        let _ = write!(html, "<b>Camera:</b> {}<br/>", xml_escape(camera));
    }
    if let Some(lens) = &entry.lens {
        let _ = write!(html, "<b>Lens:</b> {}<br/>", xml_escape(lens));
    }
    let _ = write!(
        html,
        "<b>Coordinates:</b> {:.6}, {:.6}",
        entry.latitude, entry.longitude
    );
    if let Some(altitude) = entry.altitude.filter(|a| *a > 0.0) {
        let _ = write!(html, "<br/><b>Altitude:</b> {altitude:.1} m");
    }
    if let Some(full) = &entry.full_image {
        let _ = write!(
            html,
            "<br/><a href=\"{}\">Full size</a>",
            xml_escape(full)
        );
    }
    html
}

fn coordinate_tuple(entry: &PhotoTourEntry) -> String {
    format!(
        "{},{},{}",
        entry.longitude,
        entry.latitude,
        entry.altitude.unwrap_or(0.0)
    )
}
