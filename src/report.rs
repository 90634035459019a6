//! XML and table projections of live server state

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::models::{Application, Binding, SiteSummary, WebsiteRow};
use crate::{Error, Result};

/// Placeholder written when a per-site lookup fails in the XML listing
pub const UNKNOWN: &str = "Unknown";

/// Placeholder written when a per-site lookup fails in the table
pub const NOT_AVAILABLE: &str = "N/A";

fn element<W: std::io::Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String> {
    String::from_utf8(writer.into_inner()).map_err(|e| Error::Parse(e.to_string()))
}

/// `<newDataSet><Table><set>…</set></Table>…</newDataSet>`
pub fn site_list_xml(sites: &[SiteSummary]) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Start(BytesStart::new("newDataSet")))?;

    for summary in sites {
        writer.write_event(Event::Start(BytesStart::new("Table")))?;
        writer.write_event(Event::Start(BytesStart::new("set")))?;

        element(&mut writer, "name", &summary.site.name)?;
        element(&mut writer, "id", &summary.site.id.to_string())?;
        element(&mut writer, "state", &summary.site.state.to_string())?;

        let bindings = match &summary.bindings {
            Some(bindings) => bindings
                .iter()
                .map(|b| b.binding_information.as_str())
                .collect::<Vec<_>>()
                .join(","),
            None => UNKNOWN.to_string(),
        };
        element(&mut writer, "bindings", &bindings)?;
        element(
            &mut writer,
            "physicalPath",
            summary.physical_path.as_deref().unwrap_or(UNKNOWN),
        )?;

        writer.write_event(Event::End(BytesEnd::new("set")))?;
        writer.write_event(Event::End(BytesEnd::new("Table")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("newDataSet")))?;
    finish(writer)
}

pub fn website_rows(sites: &[SiteSummary]) -> Vec<WebsiteRow> {
    sites
        .iter()
        .map(|summary| WebsiteRow {
            name: summary.site.name.clone(),
            id: summary.site.id.to_string(),
            state: summary.site.state.to_string(),
            physical_path: summary
                .physical_path
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            bindings: match &summary.bindings {
                Some(bindings) => bindings
                    .iter()
                    .map(Binding::display_url)
                    .collect::<Vec<_>>()
                    .join(", "),
                None => NOT_AVAILABLE.to_string(),
            },
        })
        .collect()
}

fn indented_document() -> Result<Writer<Vec<u8>>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    Ok(writer)
}

/// Every virtual directory of every application, as `Name`/`PhysicalPath`
pub fn virtual_directories_xml(applications: &[Application]) -> Result<String> {
    let mut writer = indented_document()?;
    writer.write_event(Event::Start(BytesStart::new("VirtualDirectories")))?;

    for vdir in applications.iter().flat_map(|a| a.virtual_directories.iter()) {
        writer.write_event(Event::Start(BytesStart::new("VirtualDirectory")))?;
        element(&mut writer, "Name", &vdir.path)?;
        element(&mut writer, "PhysicalPath", &vdir.physical_path)?;
        writer.write_event(Event::End(BytesEnd::new("VirtualDirectory")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("VirtualDirectories")))?;
    finish(writer)
}

/// Every application with the physical path of its first virtual directory
pub fn virtual_applications_xml(applications: &[Application]) -> Result<String> {
    let mut writer = indented_document()?;
    writer.write_event(Event::Start(BytesStart::new("VirtualApplications")))?;

    for app in applications {
        writer.write_event(Event::Start(BytesStart::new("Application")))?;
        element(&mut writer, "Path", &app.path)?;
        element(&mut writer, "PhysicalPath", app.first_physical_path().unwrap_or_default())?;
        writer.write_event(Event::End(BytesEnd::new("Application")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("VirtualApplications")))?;
    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ObjectState, Site, VirtualDirectory};

    fn summary(id: u64, name: &str, bindings: Option<Vec<Binding>>, path: Option<&str>) -> SiteSummary {
        SiteSummary {
            site: Site {
                id,
                name: name.to_string(),
                state: ObjectState::Started,
            },
            bindings,
            physical_path: path.map(str::to_string),
        }
    }

    #[test]
    fn test_site_list_xml_shape() {
        let xml = site_list_xml(&[summary(
            1,
            "Default",
            Some(vec![Binding::http("*:80:"), Binding::new("https", "*:443:")]),
            Some(r"C:\inetpub\wwwroot"),
        )])
        .unwrap();

        assert_eq!(
            xml,
            "<newDataSet><Table><set><name>Default</name><id>1</id><state>Started</state>\
             <bindings>*:80:,*:443:</bindings><physicalPath>C:\\inetpub\\wwwroot</physicalPath>\
             </set></Table></newDataSet>"
        );
    }

    #[test]
    fn test_site_list_xml_escapes_text() {
        let xml = site_list_xml(&[summary(2, "R&D <internal>", Some(vec![]), None)]).unwrap();
        assert!(xml.contains("<name>R&amp;D &lt;internal&gt;</name>"));
        assert!(xml.contains("<physicalPath>Unknown</physicalPath>"));
    }

    #[test]
    fn test_empty_site_list() {
        assert_eq!(site_list_xml(&[]).unwrap(), "<newDataSet></newDataSet>");
    }

    #[test]
    fn test_website_rows_fallbacks() {
        let rows = website_rows(&[
            summary(1, "ok", Some(vec![Binding::http("*:80:www.example.com")]), Some(r"C:\www")),
            summary(2, "broken", None, None),
        ]);

        assert_eq!(rows[0].bindings, "http://www.example.com:80");
        assert_eq!(rows[0].physical_path, r"C:\www");
        assert_eq!(rows[1].bindings, NOT_AVAILABLE);
        assert_eq!(rows[1].physical_path, NOT_AVAILABLE);
        assert_eq!(rows[1].id, "2");
    }

    #[test]
    fn test_virtual_directories_flatten_applications() {
        let apps = vec![
            Application::new("/", r"C:\www", "DefaultAppPool"),
            Application {
                path: "/shop".into(),
                app_pool: "ShopPool".into(),
                virtual_directories: vec![
                    VirtualDirectory::new("/", r"C:\shop"),
                    VirtualDirectory::new("/images", r"D:\images"),
                ],
            },
        ];

        let xml = virtual_directories_xml(&apps).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert_eq!(xml.matches("<VirtualDirectory>").count(), 3);
        assert!(xml.contains("<Name>/images</Name>"));
        assert!(xml.contains(r"<PhysicalPath>D:\images</PhysicalPath>"));
    }

    #[test]
    fn test_virtual_applications_use_first_directory() {
        let apps = vec![Application {
            path: "/api".into(),
            app_pool: "ApiPool".into(),
            virtual_directories: vec![VirtualDirectory::new("/", r"C:\api")],
        }];

        let xml = virtual_applications_xml(&apps).unwrap();
        assert!(xml.contains("<VirtualApplications>"));
        assert!(xml.contains("<Path>/api</Path>"));
        assert!(xml.contains(r"<PhysicalPath>C:\api</PhysicalPath>"));
    }
}
