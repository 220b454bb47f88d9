//! Inventory platform slug -> task library device type

pub const DEFAULT_DEVICE_TYPE: &str = "cisco_ios";

/// Map a NetBox platform slug (or name) to a netmiko device type
///
/// Unknown or missing platforms fall back to [`DEFAULT_DEVICE_TYPE`].
pub fn device_type_for_platform(platform: Option<&str>) -> String {
    let Some(platform) = platform.map(|p| p.trim().to_ascii_lowercase()) else {
        return DEFAULT_DEVICE_TYPE.to_string();
    };

    let device_type = if platform.contains("junos") || platform.contains("juniper") {
        "juniper_junos"
    } else if platform.contains("nxos") || platform.contains("nx-os") {
        "cisco_nxos"
    } else if platform.contains("iosxr") || platform.contains("ios-xr") {
        "cisco_xr"
    } else if platform.contains("iosxe") || platform.contains("ios-xe") || platform.contains("ios")
    {
        "cisco_ios"
    } else if platform.contains("eos") || platform.contains("arista") {
        "arista_eos"
    } else {
        DEFAULT_DEVICE_TYPE
    };
    device_type.to_string()
}

/// Strip the prefix length from an interface address (`10.0.0.1/24`)
pub fn host_from_address(address: &str) -> &str {
    address.split('/').next().unwrap_or(address).trim()
}
