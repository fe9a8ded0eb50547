// ffstats - Freifunk mesh and DHCP statistics for Graphite
//
// Copyright 2026 The ffstats Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

/// German umlauts and sharp s, replaced by their usual ASCII spelling.
static REPLACEMENTS: [(char, &str); 7] = [
    ('\u{e4}', "ae"),
    ('\u{f6}', "oe"),
    ('\u{fc}', "ue"),
    ('\u{df}', "ss"),
    ('\u{c4}', "Ae"),
    ('\u{d6}', "Oe"),
    ('\u{dc}', "Ue"),
];

fn replacement(c: char) -> Option<&'static str> {
    REPLACEMENTS.iter().find(|(k, _)| *k == c).map(|(_, v)| *v)
}

/// Replace the characters of a node hostname that have a well known ASCII
/// spelling (umlauts and sharp s) so they can be used as part of a metric path.
///
/// All other characters are left as-is. This means the result may still contain
/// characters that cannot be sent to Graphite, records containing them are dropped
/// when they are written.
pub fn transliterate(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match replacement(c) {
            Some(r) => out.push_str(r),
            None => out.push(c),
        }
    }

    out
}
