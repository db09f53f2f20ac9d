//! Provider registry seed data

use crate::models::provider::DeploymentProvider;

/// Provider selected by default in deploy dialogs
pub const DEFAULT_PROVIDER_ID: &str = "vercel";

/// The static list of deployment targets
pub fn default_providers() -> Vec<DeploymentProvider> {
    vec![
        DeploymentProvider::new(
            "vercel",
            "Vercel",
            "⚡",
            "Deploy to Vercel with automatic HTTPS and global CDN",
        )
        .connected(),
        DeploymentProvider::new(
            "netlify",
            "Netlify",
            "🌐",
            "Deploy to Netlify with continuous deployment",
        ),
        DeploymentProvider::new(
            "github-pages",
            "GitHub Pages",
            "📄",
            "Deploy static sites to GitHub Pages",
        ),
    ]
}
