//! ADSI directory entries (`IIS://` metabase and `WinNT://` accounts) via PowerShell

use super::powershell::{literal, quote, PowerShell};
use super::{AccountStore, Metabase};
use crate::models::{NewUser, Properties, PropertyValue};
use crate::{Error, Result};

const PASSWORD_VAR: &str = "IIS_ADMIN_NEW_PASSWORD";

/// `NERR_GroupNotFound` as the HRESULT `Children.Find` throws
const GROUP_NOT_FOUND: i32 = 0x8007_08ACu32 as i32;

fn open_entry(var: &str, path: &str) -> String {
    format!(
        "${} = New-Object System.DirectoryServices.DirectoryEntry({})\n",
        var,
        quote(path)
    )
}

fn assign_properties(var: &str, properties: &Properties) -> String {
    properties
        .iter()
        .map(|(name, value)| format!("${}.Properties[{}].Value = {}\n", var, quote(name), literal(value)))
        .collect()
}

/// Print `true` or `false` for a group under `$computer`; any failure other
/// than a missing group is rethrown
fn group_lookup(group: &str) -> String {
    format!(
        r#"try {{ [void]$computer.Children.Find({}, 'group'); 'true' }}
catch {{
    $e = $_.Exception
    while ($e -and $e.HResult -ne {}) {{ $e = $e.InnerException }}
    if ($e) {{ 'false' }} else {{ throw }}
}}
"#,
        quote(group),
        GROUP_NOT_FOUND
    )
}

/// Decode the `ConvertTo-Json` rendering of a single ADSI value
fn parse_value(output: &str) -> Result<Option<PropertyValue>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(trimmed)?;
    Ok(match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(PropertyValue::Bool(b)),
        serde_json::Value::Number(n) => Some(match n.as_i64() {
            Some(i) => PropertyValue::Int(i),
            None => PropertyValue::Text(n.to_string()),
        }),
        serde_json::Value::String(s) => Some(PropertyValue::Text(s)),
        serde_json::Value::Array(items) => Some(PropertyValue::List(
            items
                .into_iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        )),
        other => {
            return Err(Error::Parse(format!("Unsupported directory value: {}", other)));
        }
    })
}

/// Metabase access through `System.DirectoryServices.DirectoryEntry`
pub struct AdsiMetabase {
    ps: PowerShell,
}

impl AdsiMetabase {
    pub fn new(ps: PowerShell) -> Self {
        Self { ps }
    }
}

impl Metabase for AdsiMetabase {
    fn schema_class(&self, path: &str) -> Result<String> {
        let output = self
            .ps
            .run(&format!("{}$entry.SchemaClassName\n", open_entry("entry", path)))?;
        Ok(output.trim().to_string())
    }

    fn create_child(&self, parent: &str, name: &str, class: &str, properties: &Properties) -> Result<()> {
        self.ps.run(&format!(
            "{}$child = $parent.Children.Add({}, {})\n{}$child.CommitChanges()\n",
            open_entry("parent", parent),
            quote(name),
            quote(class),
            assign_properties("child", properties),
        ))?;
        Ok(())
    }

    fn remove_child(&self, path: &str) -> Result<()> {
        self.ps.run(&format!(
            "{}$entry.Parent.Children.Remove($entry)\n",
            open_entry("entry", path)
        ))?;
        Ok(())
    }

    fn get_property(&self, path: &str, name: &str) -> Result<Option<PropertyValue>> {
        let output = self.ps.run(&format!(
            "{}ConvertTo-Json -InputObject $entry.Properties[{}].Value -Compress\n",
            open_entry("entry", path),
            quote(name)
        ))?;
        parse_value(&output)
    }

    fn set_properties(&self, path: &str, properties: &Properties) -> Result<()> {
        self.ps.run(&format!(
            "{}{}$entry.CommitChanges()\n",
            open_entry("entry", path),
            assign_properties("entry", properties),
        ))?;
        Ok(())
    }

    fn invoke(&self, path: &str, method: &str, args: &[PropertyValue]) -> Result<Option<PropertyValue>> {
        let args: Vec<String> = args.iter().map(literal).collect();
        let output = self.ps.run(&format!(
            "{}$result = $entry.Invoke({}, [object[]]@({}))\nConvertTo-Json -InputObject $result -Compress\n",
            open_entry("entry", path),
            quote(method),
            args.join(", "),
        ))?;
        parse_value(&output)
    }
}

/// Local account store rooted at `WinNT://<host>`
pub struct AdsiAccountStore {
    ps: PowerShell,
    root: String,
}

impl AdsiAccountStore {
    pub fn new(ps: PowerShell, root: impl Into<String>) -> Self {
        Self {
            ps,
            root: root.into(),
        }
    }

    fn open_computer(&self) -> String {
        open_entry("computer", &format!("{},computer", self.root))
    }
}

impl AccountStore for AdsiAccountStore {
    fn create_user(&self, user: &NewUser) -> Result<String> {
        let script = format!(
            r#"{open}$user = $computer.Children.Add({name}, 'user')
[void]$user.Invoke('SetPassword', [object[]]@($env:{var}))
[void]$user.Invoke('Put', [object[]]@('Description', {description}))
$user.CommitChanges()
$user.Path
"#,
            open = self.open_computer(),
            name = quote(&user.username),
            var = PASSWORD_VAR,
            description = quote(&user.description),
        );

        let output = self
            .ps
            .run_with_env(&script, &[(PASSWORD_VAR, user.password.as_str())])?;
        Ok(output.trim().to_string())
    }

    fn group_exists(&self, group: &str) -> Result<bool> {
        let output = self
            .ps
            .run(&format!("{}{}", self.open_computer(), group_lookup(group)))?;
        Ok(output.trim() == "true")
    }

    fn add_group_member(&self, group: &str, member_path: &str) -> Result<()> {
        self.ps.run(&format!(
            "{}$group = $computer.Children.Find({}, 'group')\n[void]$group.Invoke('Add', [object[]]@({}))\n",
            self.open_computer(),
            quote(group),
            quote(member_path)
        ))?;
        Ok(())
    }

    fn remove_user(&self, username: &str) -> Result<()> {
        self.ps.run(&format!(
            "{}$users = $computer.Children\n$user = $users.Find({}, 'user')\n$users.Remove($user)\n",
            self.open_computer(),
            quote(username)
        ))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_properties_script() {
        let props = Properties::new()
            .set("Path", r"C:\ftp\alice")
            .set("AccessWrite", true);
        let script = assign_properties("child", &props);
        assert_eq!(
            script,
            "$child.Properties['AccessWrite'].Value = $true\n$child.Properties['Path'].Value = 'C:\\ftp\\alice'\n"
        );
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("null").unwrap(), None);
        assert_eq!(parse_value("").unwrap(), None);
        assert_eq!(parse_value("3\r\n").unwrap(), Some(PropertyValue::Int(3)));
        assert_eq!(
            parse_value("[\":80:\",\":81:shop\"]").unwrap(),
            Some(PropertyValue::List(vec![":80:".into(), ":81:shop".into()]))
        );
        assert_eq!(parse_value("\"IIsWebServer\"").unwrap(), Some(PropertyValue::from("IIsWebServer")));
    }

    #[test]
    fn test_group_lookup_rethrows_other_failures() {
        let script = group_lookup("FTP Users");
        assert!(script.starts_with("try { [void]$computer.Children.Find('FTP Users', 'group'); 'true' }"));
        assert!(script.contains("$e.HResult -ne -2147022676"));
        assert!(script.contains("if ($e) { 'false' } else { throw }"));
    }

    #[test]
    fn test_open_entry_quotes_path() {
        assert_eq!(
            open_entry("e", "IIS://localhost/W3SVC/1/Root"),
            "$e = New-Object System.DirectoryServices.DirectoryEntry('IIS://localhost/W3SVC/1/Root')\n"
        );
    }
}
