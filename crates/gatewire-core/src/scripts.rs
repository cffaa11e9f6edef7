//! Boot scripts for the compute instance

/// Installs and starts nginx on port 80 (Ubuntu images)
pub const NGINX_SETUP: &str = r#"
    # Install Nginx
    sudo apt-get update
    sudo apt-get install nginx -y
    sudo systemctl start nginx
"#;

/// Get the script content for a built-in script name
pub fn get_builtin_script(name: &str) -> Option<&'static str> {
    match name {
        "nginx" => Some(NGINX_SETUP),
        _ => None,
    }
}
